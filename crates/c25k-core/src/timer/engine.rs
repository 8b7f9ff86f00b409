//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It holds no
//! threads and never reads the clock itself: every command takes `now_ms`
//! (milliseconds since the epoch) and the caller drives `recompute()`
//! periodically. See [`super::TimerRunner`] for the tokio adapter.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Completed
//! ```
//!
//! ## Recomputation
//!
//! Position is never decremented per tick. Each `recompute()` derives the
//! elapsed seconds from `now - session_start` and walks the intervals to find
//! where that lands, so delayed or dropped ticks cannot desync the countdown.
//! A single recompute may cross several intervals; it then reports only the
//! interval it lands in.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(workout);
//! engine.start(now_ms);
//! // On every tick and whenever the app returns to the foreground:
//! for event in engine.recompute(now_ms) { /* ... */ }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::program::{Interval, Workout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Where an elapsed time falls inside a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    /// Seconds accumulated by all intervals before `index`.
    pub offset_secs: u64,
    pub remaining_secs: u64,
}

/// Find the interval containing `elapsed_secs`.
///
/// Returns `None` once `elapsed_secs` reaches the total duration.
pub fn locate(intervals: &[Interval], elapsed_secs: u64) -> Option<Position> {
    let mut offset_secs = 0u64;
    for (index, interval) in intervals.iter().enumerate() {
        let end = offset_secs + interval.duration_seconds;
        if end > elapsed_secs {
            return Some(Position {
                index,
                offset_secs,
                remaining_secs: end.saturating_sub(elapsed_secs),
            });
        }
        offset_secs = end;
    }
    None
}

/// Countdown state machine for one workout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    workout: Workout,
    state: TimerState,
    interval_index: usize,
    remaining_secs: u64,
    /// Position in the workout as of the last recompute.
    elapsed_secs: u64,
    /// Anchor of the position clock. Moved forward by pauses and backward
    /// by skips, so `now - anchor` is always the position in the workout.
    #[serde(default)]
    session_start_epoch_ms: Option<u64>,
    #[serde(default)]
    interval_start_epoch_ms: Option<u64>,
    #[serde(default)]
    paused_at_epoch_ms: Option<u64>,
    /// Position credited by skips without any time being spent.
    #[serde(default)]
    skipped_ms: u64,
    #[serde(default)]
    completed_duration_secs: Option<u64>,
}

impl TimerEngine {
    /// Create a new engine for `workout`, idle on its first interval.
    pub fn new(workout: Workout) -> Self {
        let remaining_secs = workout
            .intervals
            .first()
            .map(|i| i.duration_seconds)
            .unwrap_or(0);
        Self {
            workout,
            state: TimerState::Idle,
            interval_index: 0,
            remaining_secs,
            elapsed_secs: 0,
            session_start_epoch_ms: None,
            interval_start_epoch_ms: None,
            paused_at_epoch_ms: None,
            skipped_ms: 0,
            completed_duration_secs: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn workout(&self) -> &Workout {
        &self.workout
    }

    pub fn interval_index(&self) -> usize {
        self.interval_index
    }

    pub fn current_interval(&self) -> Option<&Interval> {
        self.workout.intervals.get(self.interval_index)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn session_start_epoch_ms(&self) -> Option<u64> {
        self.session_start_epoch_ms
    }

    pub fn interval_start_epoch_ms(&self) -> Option<u64> {
        self.interval_start_epoch_ms
    }

    /// Final duration in seconds, once completed.
    pub fn completed_duration_secs(&self) -> Option<u64> {
        self.completed_duration_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.workout.total_duration_secs()
    }

    /// 0.0 .. 100.0 progress across the whole workout.
    pub fn progress_pct(&self) -> f64 {
        if self.state == TimerState::Completed {
            return 100.0;
        }
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        (self.elapsed_secs as f64 / total as f64 * 100.0).min(100.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now_ms: u64) -> Event {
        let interval = self
            .current_interval()
            .copied()
            .unwrap_or(Interval::new(crate::program::IntervalType::Cooldown, 0));
        Event::StateSnapshot {
            state: self.state,
            workout_id: self.workout.id(),
            interval_index: self.interval_index,
            interval_count: self.workout.intervals.len(),
            interval_type: interval.interval_type,
            remaining_secs: self.remaining_secs,
            interval_total_secs: interval.duration_seconds,
            elapsed_secs: self.elapsed_secs,
            progress_pct: self.progress_pct(),
            at: at(now_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64) -> Vec<Event> {
        if self.state != TimerState::Idle {
            return Vec::new();
        }
        let Some(first) = self.workout.intervals.first().copied() else {
            return vec![self.complete(now_ms, now_ms)];
        };

        self.state = TimerState::Running;
        self.interval_index = 0;
        self.remaining_secs = first.duration_seconds;
        self.elapsed_secs = 0;
        self.session_start_epoch_ms = Some(now_ms);
        self.interval_start_epoch_ms = Some(now_ms);
        tracing::debug!(workout = %self.workout.id(), "timer started");

        vec![
            Event::TimerStarted {
                workout_id: self.workout.id(),
                total_secs: self.total_secs(),
                at: at(now_ms),
            },
            Event::IntervalEntered {
                index: 0,
                interval_type: first.interval_type,
                duration_secs: first.duration_seconds,
                skipped_over: 0,
                at: at(now_ms),
            },
        ]
    }

    pub fn pause(&mut self, now_ms: u64) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        // Bring the position up to date; the workout may have ended meanwhile.
        let mut events = self.recompute(now_ms);
        if self.state != TimerState::Running {
            return events;
        }

        self.state = TimerState::Paused;
        self.paused_at_epoch_ms = Some(now_ms);
        tracing::debug!(remaining = self.remaining_secs, "timer paused");
        events.push(Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: at(now_ms),
        });
        events
    }

    pub fn resume(&mut self, now_ms: u64) -> Vec<Event> {
        if self.state != TimerState::Paused {
            return Vec::new();
        }
        let paused_for = self
            .paused_at_epoch_ms
            .take()
            .map(|p| now_ms.saturating_sub(p))
            .unwrap_or(0);
        self.session_start_epoch_ms = self.session_start_epoch_ms.map(|s| s + paused_for);
        self.interval_start_epoch_ms = self.interval_start_epoch_ms.map(|s| s + paused_for);
        self.state = TimerState::Running;
        tracing::debug!(paused_for_ms = paused_for, "timer resumed");

        vec![Event::TimerResumed {
            remaining_secs: self.remaining_secs,
            at: at(now_ms),
        }]
    }

    /// Jump to the start of the next interval. Skipping the last interval
    /// completes the workout.
    pub fn skip(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = match self.state {
            TimerState::Running => self.recompute(now_ms),
            TimerState::Paused => Vec::new(),
            _ => return Vec::new(),
        };
        if !matches!(self.state, TimerState::Running | TimerState::Paused) {
            return events;
        }
        // While paused, position is frozen at the pause instant.
        let reference_ms = self.paused_at_epoch_ms.unwrap_or(now_ms);
        let from = self.interval_index;
        let to = from + 1;

        let Some(next) = self.workout.intervals.get(to).copied() else {
            events.push(self.complete(reference_ms, now_ms));
            return events;
        };

        let start = self.session_start_epoch_ms.unwrap_or(reference_ms);
        let target_ms = self.workout.interval_start_offset(to).saturating_mul(1000);
        let position_ms = reference_ms.saturating_sub(start);
        let credit = target_ms.saturating_sub(position_ms);

        self.skipped_ms += credit;
        self.session_start_epoch_ms = Some(start.saturating_sub(credit));
        self.interval_start_epoch_ms = Some(reference_ms);
        self.interval_index = to;
        self.remaining_secs = next.duration_seconds;
        self.elapsed_secs = target_ms / 1000;
        tracing::debug!(from, to, credit_ms = credit, "interval skipped");

        events.push(Event::IntervalSkipped {
            from_index: from,
            to_index: to,
            at: at(now_ms),
        });
        events.push(Event::IntervalEntered {
            index: to,
            interval_type: next.interval_type,
            duration_secs: next.duration_seconds,
            skipped_over: 0,
            at: at(now_ms),
        });
        events
    }

    pub fn reset(&mut self, now_ms: u64) -> Vec<Event> {
        *self = Self::new(self.workout.clone());
        vec![Event::TimerReset { at: at(now_ms) }]
    }

    /// Re-derive the current interval and remaining time from the wall clock.
    ///
    /// Safe to call at any cadence and any number of times; calling it twice
    /// with the same `now_ms` leaves the state unchanged and emits nothing the
    /// second time. Does nothing unless running.
    pub fn recompute(&mut self, now_ms: u64) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let start = *self.session_start_epoch_ms.get_or_insert(now_ms);
        let total_elapsed = now_ms.saturating_sub(start) / 1000;
        self.elapsed_secs = total_elapsed;

        let Some(pos) = locate(&self.workout.intervals, total_elapsed) else {
            return vec![self.complete(now_ms, now_ms)];
        };

        let mut events = Vec::new();
        if pos.index != self.interval_index {
            let from = self.interval_index;
            let entered = self.workout.intervals[pos.index];
            self.interval_index = pos.index;
            self.interval_start_epoch_ms = Some(start + pos.offset_secs * 1000);
            let skipped_over = pos.index.saturating_sub(from + 1);
            if skipped_over > 0 {
                tracing::debug!(from, to = pos.index, skipped_over, "caught up across intervals");
            }
            events.push(Event::IntervalEntered {
                index: pos.index,
                interval_type: entered.interval_type,
                duration_secs: entered.duration_seconds,
                skipped_over,
                at: at(now_ms),
            });
        }
        self.remaining_secs = pos.remaining_secs;
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Finish the session. `reference_ms` is the instant whose position
    /// ends the workout; time credited by skips is not counted as spent.
    fn complete(&mut self, reference_ms: u64, now_ms: u64) -> Event {
        let start = self.session_start_epoch_ms.unwrap_or(reference_ms);
        let spent_ms = reference_ms
            .saturating_sub(start)
            .saturating_sub(self.skipped_ms);
        let duration_secs = spent_ms / 1000;

        self.state = TimerState::Completed;
        self.interval_index = self.workout.intervals.len().saturating_sub(1);
        self.remaining_secs = 0;
        self.elapsed_secs = self.total_secs();
        self.paused_at_epoch_ms = None;
        self.completed_duration_secs = Some(duration_secs);
        tracing::debug!(workout = %self.workout.id(), duration_secs, "workout completed");

        Event::WorkoutCompleted {
            workout_id: self.workout.id(),
            duration_secs,
            at: at(now_ms),
        }
    }
}

fn at(epoch_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms as i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{get_workout_by_id, IntervalType};

    const T0: u64 = 1_700_000_000_000;

    fn secs(s: u64) -> u64 {
        T0 + s * 1000
    }

    fn w1d1() -> TimerEngine {
        TimerEngine::new(get_workout_by_id("W1D1").unwrap().clone())
    }

    fn cue_count(events: &[Event]) -> usize {
        events.iter().filter(|e| e.cue().is_some()).count()
    }

    #[test]
    fn interval_anchor_follows_pause_and_skip() {
        let mut engine = w1d1();
        assert_eq!(engine.interval_start_epoch_ms(), None);

        engine.start(T0);
        assert_eq!(engine.interval_start_epoch_ms(), Some(T0));

        engine.pause(secs(10));
        engine.resume(secs(70));
        assert_eq!(engine.interval_start_epoch_ms(), Some(secs(60)));
        assert_eq!(engine.session_start_epoch_ms(), Some(secs(60)));

        engine.skip(secs(80));
        assert_eq!(engine.interval_start_epoch_ms(), Some(secs(80)));
        assert_eq!(engine.interval_index(), 1);
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = w1d1();
        assert_eq!(engine.state(), TimerState::Idle);

        assert!(!engine.start(T0).is_empty());
        assert_eq!(engine.state(), TimerState::Running);

        assert!(!engine.pause(secs(1)).is_empty());
        assert_eq!(engine.state(), TimerState::Paused);

        assert!(!engine.resume(secs(2)).is_empty());
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn commands_in_wrong_state_are_noops() {
        let mut engine = w1d1();
        assert!(engine.pause(T0).is_empty());
        assert!(engine.resume(T0).is_empty());
        assert!(engine.skip(T0).is_empty());
        assert!(engine.recompute(T0).is_empty());
        engine.start(T0);
        assert!(engine.start(secs(1)).is_empty());
        assert!(engine.resume(secs(1)).is_empty());
    }

    #[test]
    fn start_enters_first_interval_without_cue_for_warmup() {
        let mut engine = w1d1();
        let events = engine.start(T0);
        assert!(matches!(events[0], Event::TimerStarted { total_secs: 1710, .. }));
        assert!(matches!(
            events[1],
            Event::IntervalEntered { index: 0, interval_type: IntervalType::Warmup, .. }
        ));
        assert_eq!(cue_count(&events), 0);
        assert_eq!(engine.remaining_secs(), 300);
    }

    #[test]
    fn start_cues_when_first_interval_is_a_run() {
        let workout = Workout {
            week: 1,
            day: 1,
            intervals: vec![Interval::new(IntervalType::Run, 30)],
        };
        let mut engine = TimerEngine::new(workout);
        assert_eq!(cue_count(&engine.start(T0)), 1);
    }

    #[test]
    fn after_warmup_first_run_has_sixty_seconds() {
        let mut engine = w1d1();
        engine.start(T0);
        let events = engine.recompute(secs(300));
        assert_eq!(engine.interval_index(), 1);
        assert_eq!(engine.remaining_secs(), 60);
        assert_eq!(cue_count(&events), 1);
        assert_eq!(events[0].cue(), Some(IntervalType::Run));
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut engine = w1d1();
        engine.start(T0);
        let first = engine.recompute(secs(455));
        let snap_a = engine.snapshot(secs(455));
        let second = engine.recompute(secs(455));
        let snap_b = engine.snapshot(secs(455));
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(snap_a, snap_b);
    }

    #[test]
    fn sub_second_ticks_floor_elapsed() {
        let mut engine = w1d1();
        engine.start(T0);
        engine.recompute(T0 + 999);
        assert_eq!(engine.remaining_secs(), 300);
        engine.recompute(T0 + 1000);
        assert_eq!(engine.remaining_secs(), 299);
    }

    #[test]
    fn catch_up_after_suspension_emits_one_cue() {
        let mut engine = w1d1();
        engine.start(T0);
        // Warmup 300, run 60, walk 90, run 60 -> 515s is 5s into the walk at index 4.
        let events = engine.recompute(secs(515));
        assert_eq!(engine.interval_index(), 4);
        assert_eq!(engine.remaining_secs(), 85);
        assert_eq!(events.len(), 1);
        assert_eq!(cue_count(&events), 1);
        assert!(matches!(events[0], Event::IntervalEntered { skipped_over: 3, .. }));
    }

    #[test]
    fn pause_resume_preserves_remaining() {
        let mut engine = w1d1();
        engine.start(T0);
        engine.recompute(secs(100));
        engine.pause(secs(100) + 400);
        let before = engine.remaining_secs();

        engine.resume(secs(5_000));
        assert_eq!(engine.remaining_secs(), before);
        engine.recompute(secs(5_000));
        assert_eq!(engine.remaining_secs(), before);
        assert_eq!(engine.interval_index(), 0);
    }

    #[test]
    fn paused_time_is_excluded_from_duration() {
        let mut engine = w1d1();
        engine.start(T0);
        engine.pause(secs(600));
        engine.resume(secs(1_600));
        let events = engine.recompute(secs(1_000 + 1_710));
        assert_eq!(engine.state(), TimerState::Completed);
        assert!(matches!(
            events.last(),
            Some(Event::WorkoutCompleted { duration_secs: 1710, .. })
        ));
    }

    #[test]
    fn resume_does_not_cue() {
        let mut engine = w1d1();
        engine.start(T0);
        engine.recompute(secs(310));
        engine.pause(secs(320));
        let events = engine.resume(secs(400));
        assert_eq!(cue_count(&events), 0);
        assert!(engine.recompute(secs(400)).is_empty());
    }

    #[test]
    fn pause_after_workout_ended_completes_instead() {
        let mut engine = w1d1();
        engine.start(T0);
        let events = engine.pause(secs(2_000));
        assert_eq!(engine.state(), TimerState::Completed);
        assert!(matches!(events.last(), Some(Event::WorkoutCompleted { duration_secs: 2000, .. })));
    }

    #[test]
    fn skip_advances_and_cues() {
        let mut engine = w1d1();
        engine.start(T0);
        let events = engine.skip(secs(10));
        assert_eq!(engine.interval_index(), 1);
        assert_eq!(engine.remaining_secs(), 60);
        assert_eq!(cue_count(&events), 1);

        // Position follows the skip: 20s later we are 20s into the run.
        engine.recompute(secs(30));
        assert_eq!(engine.interval_index(), 1);
        assert_eq!(engine.remaining_secs(), 40);
    }

    #[test]
    fn skip_while_paused_stays_paused() {
        let mut engine = w1d1();
        engine.start(T0);
        engine.pause(secs(50));
        engine.skip(secs(60));
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.interval_index(), 1);
        engine.resume(secs(100));
        engine.recompute(secs(110));
        assert_eq!(engine.interval_index(), 1);
        assert_eq!(engine.remaining_secs(), 50);
    }

    #[test]
    fn skip_on_last_interval_completes() {
        let mut engine = w1d1();
        engine.start(T0);
        let last = engine.workout().intervals.len() - 1;
        let mut now = T0;
        while engine.interval_index() < last {
            now += 1000;
            engine.skip(now);
        }
        assert_eq!(engine.state(), TimerState::Running);
        now += 1000;
        let events = engine.skip(now);
        assert_eq!(engine.state(), TimerState::Completed);
        // Only the seconds actually spent count: one per skip.
        assert!(matches!(
            events.last(),
            Some(Event::WorkoutCompleted { duration_secs, .. }) if *duration_secs == (last as u64 + 1)
        ));
    }

    #[test]
    fn completion_is_reported_once() {
        let mut engine = w1d1();
        engine.start(T0);
        let events = engine.recompute(secs(1_710));
        let completions = events
            .iter()
            .filter(|e| matches!(e, Event::WorkoutCompleted { .. }))
            .count();
        assert_eq!(completions, 1);
        assert!(engine.recompute(secs(1_800)).is_empty());
        assert_eq!(engine.completed_duration_secs(), Some(1_710));
        assert_eq!(engine.remaining_secs(), 0);
    }

    #[test]
    fn late_completion_reports_real_elapsed() {
        let mut engine = w1d1();
        engine.start(T0);
        let events = engine.recompute(secs(1_750));
        assert!(matches!(events[0], Event::WorkoutCompleted { duration_secs: 1750, .. }));
    }

    #[test]
    fn reset_goes_to_beginning() {
        let mut engine = w1d1();
        engine.start(T0);
        engine.skip(secs(1));
        engine.skip(secs(2));
        engine.reset(secs(3));
        assert_eq!(engine.interval_index(), 0);
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.remaining_secs(), 300);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = w1d1();
        match engine.snapshot(T0) {
            Event::StateSnapshot {
                state,
                interval_index,
                remaining_secs,
                interval_count,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(interval_index, 0);
                assert_eq!(remaining_secs, 300);
                assert_eq!(interval_count, 17);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    #[test]
    fn engine_survives_serde_roundtrip() {
        let mut engine = w1d1();
        engine.start(T0);
        engine.recompute(secs(320));
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: TimerEngine = serde_json::from_str(&json).unwrap();
        restored.recompute(secs(330));
        assert_eq!(restored.interval_index(), 1);
        assert_eq!(restored.remaining_secs(), 30);
    }

    #[test]
    fn locate_boundaries() {
        let w = get_workout_by_id("W1D1").unwrap();
        assert_eq!(locate(&w.intervals, 0).unwrap().index, 0);
        assert_eq!(locate(&w.intervals, 299).unwrap().remaining_secs, 1);
        let p = locate(&w.intervals, 300).unwrap();
        assert_eq!((p.index, p.offset_secs, p.remaining_secs), (1, 300, 60));
        assert!(locate(&w.intervals, 1_710).is_none());
    }
}
