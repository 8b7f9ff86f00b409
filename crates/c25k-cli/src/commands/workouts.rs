use clap::Subcommand;
use c25k_core::program::{workouts, workouts_for_week};

use super::{find_workout, format_secs, open_local, CliResult};

#[derive(Subcommand)]
pub enum WorkoutsAction {
    /// List the program, optionally a single week
    List {
        /// Week number (1-9)
        #[arg(long)]
        week: Option<u32>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the intervals of one workout
    Show {
        /// Workout id (e.g. "W3D2")
        id: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: WorkoutsAction) -> CliResult {
    match action {
        WorkoutsAction::List { week, json } => {
            let selected: Vec<_> = match week {
                Some(week) => workouts_for_week(week).collect(),
                None => workouts().iter().collect(),
            };
            if selected.is_empty() {
                return Err(format!("no workouts for week {}", week.unwrap_or(0)).into());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&selected)?);
                return Ok(());
            }

            let local = open_local()?;
            let done = local.completed_ids();
            for w in selected {
                let id = w.id().to_string();
                let mark = if done.contains(&id) { "x" } else { " " };
                println!(
                    "[{mark}] {id:<5} {:>6}  {} runs, {} running",
                    format_secs(w.total_duration_secs()),
                    w.run_count(),
                    format_secs(w.run_secs()),
                );
            }
        }
        WorkoutsAction::Show { id, json } => {
            let workout = find_workout(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(workout)?);
                return Ok(());
            }

            println!(
                "{} (week {}, day {}), total {}",
                workout.id(),
                workout.week,
                workout.day,
                format_secs(workout.total_duration_secs())
            );
            for (i, interval) in workout.intervals.iter().enumerate() {
                println!(
                    "  {:>2}. {:>6}  {:<8} {}",
                    i + 1,
                    format_secs(workout.interval_start_offset(i)),
                    interval.interval_type.label(),
                    format_secs(interval.duration_seconds),
                );
            }
        }
    }
    Ok(())
}
