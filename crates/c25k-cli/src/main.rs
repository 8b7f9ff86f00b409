use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "c25k", version, about = "Couch-to-5K companion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the 9-week program
    Workouts {
        #[command(subcommand)]
        action: commands::workouts::WorkoutsAction,
    },
    /// Run a workout with live countdown and cues
    Run(commands::run::RunArgs),
    /// Record a workout as done
    Complete(commands::complete::CompleteArgs),
    /// Program progress
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Sync progress with the remote store
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Sign in and out
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Workouts { action } => commands::workouts::run(action),
        Commands::Run(args) => commands::run::run(args),
        Commands::Complete(args) => commands::complete::run(args),
        Commands::Progress { action } => commands::progress::run(action),
        Commands::Sync { action } => commands::sync::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
