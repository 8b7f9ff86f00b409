use clap::Subcommand;

use super::{format_secs, open_local, CliResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Program overview and next workout
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recorded completions
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget all local progress (the remote copy is untouched)
    Clear,
}

pub fn run(action: ProgressAction) -> CliResult {
    let local = open_local()?;
    match action {
        ProgressAction::Show { json } => {
            let progress = local.program_progress();
            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
                return Ok(());
            }
            println!(
                "{}/{} workouts ({:.1}%)",
                progress.completed, progress.total, progress.percent
            );
            for week in &progress.weeks {
                let days: String = (1..=3)
                    .map(|d| if week.completed_days.contains(&d) { 'x' } else { '.' })
                    .collect();
                println!("  week {}: {days}", week.week);
            }
            match &progress.next_workout {
                Some(next) => println!("next: {next}"),
                None => println!("program complete"),
            }
        }
        ProgressAction::History { json } => {
            let mut completions = local.get_progress().completions;
            completions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
            if json {
                println!("{}", serde_json::to_string_pretty(&completions)?);
                return Ok(());
            }
            if completions.is_empty() {
                println!("no completed workouts");
            }
            for c in completions {
                let duration = c
                    .duration_seconds
                    .map(format_secs)
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:<5} {}  {duration}",
                    c.workout_id,
                    c.completed_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ProgressAction::Clear => {
            local.clear_progress()?;
            println!("local progress cleared");
        }
    }
    Ok(())
}
