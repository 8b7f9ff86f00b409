//! Guided workout session in the terminal.
//!
//! Keys (followed by Enter): `p` pause, `r` resume, `s` skip interval,
//! `q` quit without recording. An empty line refreshes immediately.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use c25k_core::audio::{AudioCueEngine, TerminalSink};
use c25k_core::program::Workout;
use c25k_core::sync::WorkoutCompletion;
use c25k_core::timer::{NoWakeLock, SystemClock, TimerRunner, TimerState};
use c25k_core::{Config, Event};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{describe_outcome, find_workout, format_secs, record, runtime, CliResult};

#[derive(Args)]
pub struct RunArgs {
    /// Workout id (e.g. "W1D1")
    id: String,
    /// Disable audio cues for this session
    #[arg(long)]
    no_audio: bool,
    /// Print timer events as JSON lines instead of a countdown
    #[arg(long)]
    json: bool,
    /// Do not record the completion
    #[arg(long)]
    no_record: bool,
}

pub fn run(args: RunArgs) -> CliResult {
    let workout = find_workout(&args.id)?.clone();
    let config = Config::load_or_default();
    let cues = (!args.no_audio && config.audio.enabled)
        .then(|| Arc::new(AudioCueEngine::init(TerminalSink, &config.audio)));

    let rt = runtime()?;
    let finished = rt.block_on(session(workout, &config, cues, args.json));
    // stdin reads sit on a blocking thread; don't wait for them.
    rt.shutdown_background();

    match finished? {
        Some(duration_secs) if !args.no_record => {
            let completion = WorkoutCompletion::new(args.id.clone(), Some(duration_secs));
            let outcome = record(&config, completion)?;
            println!("{}: {}", args.id, describe_outcome(outcome));
        }
        Some(_) => println!("{}: finished, not recorded", args.id),
        None => println!("{}: stopped, not recorded", args.id),
    }
    Ok(())
}

/// Drive one session. Returns the seconds spent if the workout finished.
async fn session(
    workout: Workout,
    config: &Config,
    cues: Option<Arc<AudioCueEngine>>,
    json: bool,
) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    let (runner, mut events) =
        TimerRunner::new(workout, Arc::new(SystemClock), Arc::new(NoWakeLock), cues);
    let mut runner = runner.with_poll_interval(config.timer.poll_interval());
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut display = tokio::time::interval(Duration::from_secs(1));

    runner.start();
    let outcome = loop {
        tokio::select! {
            Some(event) = events.recv() => {
                render_event(&event, json)?;
                if let Event::WorkoutCompleted { duration_secs, .. } = event {
                    break Some(duration_secs);
                }
            }
            _ = display.tick(), if !json => render_status(&runner.snapshot()),
            line = input.next_line(), if stdin_open => match line {
                Ok(Some(cmd)) => {
                    if !handle_key(&mut runner, cmd.trim()) {
                        break None;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("stdin closed: {e}");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break None,
        }
    };
    runner.dispose();
    Ok(outcome)
}

/// Returns false when the user asked to quit.
fn handle_key(runner: &mut TimerRunner, key: &str) -> bool {
    match key {
        "p" => runner.pause(),
        "r" => runner.resume(),
        "s" => runner.skip(),
        "q" => return false,
        "" => runner.notify_foreground(),
        other => eprintln!("unknown key '{other}' (p, r, s, q)"),
    }
    true
}

fn render_event(event: &Event, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::TimerStarted { workout_id, total_secs, .. } => {
            println!("{workout_id}: {} total", format_secs(*total_secs));
        }
        Event::IntervalEntered { index, interval_type, duration_secs, skipped_over, .. } => {
            if *skipped_over > 0 {
                println!("\n(caught up over {skipped_over} intervals)");
            }
            println!("\n#{} {} for {}", index + 1, interval_type.label(), format_secs(*duration_secs));
        }
        Event::TimerPaused { remaining_secs, .. } => {
            println!("\npaused, {} left in interval", format_secs(*remaining_secs));
        }
        Event::TimerResumed { .. } => println!("resumed"),
        Event::IntervalSkipped { from_index, .. } => println!("\nskipped #{}", from_index + 1),
        Event::WorkoutCompleted { duration_secs, .. } => {
            println!("\nworkout complete in {}", format_secs(*duration_secs));
        }
        Event::TimerReset { .. } | Event::StateSnapshot { .. } => {}
    }
    Ok(())
}

fn render_status(snapshot: &Event) {
    let Event::StateSnapshot {
        state,
        interval_type,
        remaining_secs,
        progress_pct,
        ..
    } = snapshot
    else {
        return;
    };
    if *state != TimerState::Running {
        return;
    }
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        "\r{:<9} {:>6} left  {:>5.1}%  ",
        interval_type.label(),
        format_secs(*remaining_secs),
        progress_pct
    );
    let _ = out.flush();
}
