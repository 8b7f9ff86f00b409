use clap::Args;
use c25k_core::sync::WorkoutCompletion;
use c25k_core::Config;

use super::{describe_outcome, find_workout, record, CliResult};

#[derive(Args)]
pub struct CompleteArgs {
    /// Workout id (e.g. "W1D1")
    id: String,
    /// Seconds actually spent; omit if unknown
    #[arg(long)]
    duration: Option<u64>,
}

/// Mark a workout done without running the timer.
pub fn run(args: CompleteArgs) -> CliResult {
    let workout = find_workout(&args.id)?;
    let config = Config::load_or_default();
    let completion = WorkoutCompletion::new(workout.id().to_string(), args.duration);
    let outcome = record(&config, completion)?;
    println!("{}: {}", workout.id(), describe_outcome(outcome));
    Ok(())
}
