//! Tokio adapter around [`TimerEngine`].
//!
//! Owns the engine behind a mutex and drives `recompute()` from a single
//! task that waits on either the polling interval or a foreground signal.
//! Both triggers share that one `select!` loop, so recomputation never runs
//! concurrently with itself.
//!
//! All commands must be issued from within a Tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::clock::Clock;
use super::engine::{TimerEngine, TimerState};
use super::wake_lock::{WakeLockGuard, WakeLockProvider};
use crate::audio::AudioCueEngine;
use crate::events::Event;
use crate::program::Workout;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

struct Session {
    engine: TimerEngine,
    wake: Option<WakeLockGuard>,
}

/// Everything the tick task needs, shared with the runner.
struct Shared {
    session: Mutex<Session>,
    clock: Arc<dyn Clock>,
    cues: Option<Arc<AudioCueEngine>>,
    events: mpsc::UnboundedSender<Event>,
    foreground: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn publish(&self, events: Vec<Event>) {
        for event in events {
            if let Some(cues) = &self.cues {
                cues.handle(&event);
            }
            // The receiver going away only means nobody is rendering.
            let _ = self.events.send(event);
        }
    }
}

pub struct TimerRunner {
    shared: Arc<Shared>,
    wake_lock: Arc<dyn WakeLockProvider>,
    poll_interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl TimerRunner {
    pub fn new(
        workout: Workout,
        clock: Arc<dyn Clock>,
        wake_lock: Arc<dyn WakeLockProvider>,
        cues: Option<Arc<AudioCueEngine>>,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    engine: TimerEngine::new(workout),
                    wake: None,
                }),
                clock,
                cues,
                events: tx,
                foreground: Notify::new(),
            }),
            wake_lock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            task: None,
        };
        (runner, rx)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn state(&self) -> TimerState {
        self.shared.lock().engine.state()
    }

    pub fn snapshot(&self) -> Event {
        let now = self.shared.clock.now_ms();
        self.shared.lock().engine.snapshot(now)
    }

    pub fn start(&mut self) {
        self.command(TimerEngine::start);
    }

    pub fn pause(&mut self) {
        self.command(TimerEngine::pause);
    }

    pub fn resume(&mut self) {
        self.command(TimerEngine::resume);
    }

    pub fn skip(&mut self) {
        self.command(TimerEngine::skip);
    }

    /// The host came back to the foreground: recompute now instead of
    /// waiting for the next poll.
    pub fn notify_foreground(&self) {
        self.shared.foreground.notify_one();
    }

    /// Stop ticking and release the wake lock. The engine keeps its state.
    pub fn dispose(&mut self) {
        self.stop_task();
        self.shared.lock().wake = None;
        if let Some(cues) = &self.shared.cues {
            cues.dispose();
        }
    }

    fn command(&mut self, op: fn(&mut TimerEngine, u64) -> Vec<Event>) {
        let now = self.shared.clock.now_ms();
        let (events, running) = {
            let mut session = self.shared.lock();
            let events = op(&mut session.engine, now);
            let running = session.engine.state() == TimerState::Running;
            if running {
                if session.wake.is_none() {
                    session.wake = WakeLockGuard::acquire(&self.wake_lock);
                }
            } else {
                session.wake = None;
            }
            (events, running)
        };
        self.shared.publish(events);

        if running {
            self.spawn_task();
        } else {
            self.stop_task();
        }
    }

    fn spawn_task(&mut self) {
        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let period = self.poll_interval;
        self.task = Some(tokio::spawn(drive(shared, period)));
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TimerRunner {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn drive(shared: Arc<Shared>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shared.foreground.notified() => {}
        }
        let (events, finished) = {
            let mut session = shared.lock();
            let events = session.engine.recompute(shared.clock.now_ms());
            let finished = session.engine.state() != TimerState::Running;
            if finished {
                session.wake = None;
            }
            (events, finished)
        };
        shared.publish(events);
        if finished {
            break;
        }
    }
}
