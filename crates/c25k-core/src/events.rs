use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::program::{IntervalType, WorkoutId};
use crate::timer::TimerState;

/// Every timer state change produces an Event.
/// The presentation layer renders them; the audio cue engine listens for
/// `IntervalEntered`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        workout_id: WorkoutId,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A new interval became current, by countdown, catch-up or skip.
    /// `skipped_over` counts intervals jumped across without being entered.
    IntervalEntered {
        index: usize,
        interval_type: IntervalType,
        duration_secs: u64,
        skipped_over: usize,
        at: DateTime<Utc>,
    },
    IntervalSkipped {
        from_index: usize,
        to_index: usize,
        at: DateTime<Utc>,
    },
    WorkoutCompleted {
        workout_id: WorkoutId,
        /// Seconds actually spent, not the nominal program length.
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        workout_id: WorkoutId,
        interval_index: usize,
        interval_count: usize,
        interval_type: IntervalType,
        remaining_secs: u64,
        interval_total_secs: u64,
        elapsed_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The interval type to announce, if this event should trigger a cue.
    pub fn cue(&self) -> Option<IntervalType> {
        match self {
            Event::IntervalEntered { interval_type, .. } if interval_type.is_cued() => {
                Some(*interval_type)
            }
            _ => None,
        }
    }
}
