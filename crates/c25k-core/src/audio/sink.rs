use std::io::Write;

use super::cue::{CueAction, CuePlan};

/// Output device for cues. Implementations must not block the caller:
/// cues are fired from the timer's tick path.
pub trait CueSink: Send + Sync {
    fn play(&self, plan: &CuePlan);
}

/// Logs cues instead of playing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl CueSink for TracingSink {
    fn play(&self, plan: &CuePlan) {
        tracing::info!(interval = ?plan.interval_type, steps = plan.steps.len(), "cue");
    }
}

/// Rings the terminal bell once per tone and prints the spoken word.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSink;

impl CueSink for TerminalSink {
    fn play(&self, plan: &CuePlan) {
        let mut line = String::new();
        for step in &plan.steps {
            match &step.action {
                CueAction::Tone(_) => line.push('\x07'),
                CueAction::Speak { text } => {
                    line.push_str(">> ");
                    line.push_str(text);
                }
            }
        }
        if plan.spoken_text().is_none() {
            line.push_str(">> ");
            line.push_str(plan.interval_type.label());
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }
}
