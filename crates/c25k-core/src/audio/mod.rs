//! Audio cue engine.
//!
//! Announces run and walk intervals as the timer enters them. The engine is
//! an owned service: create it with [`AudioCueEngine::init`], hand it to the
//! timer runner, and call [`AudioCueEngine::dispose`] when the session view
//! goes away. A disposed engine ignores further events.

mod cue;
mod sink;

use std::sync::atomic::{AtomicBool, Ordering};

pub use cue::{CueAction, CuePlan, CueStep, Tone};
pub use sink::{CueSink, TerminalSink, TracingSink};

use crate::events::Event;
use crate::storage::AudioConfig;

pub struct AudioCueEngine {
    sink: Box<dyn CueSink>,
    speech: bool,
    active: AtomicBool,
}

impl AudioCueEngine {
    pub fn init(sink: impl CueSink + 'static, config: &AudioConfig) -> Self {
        Self {
            sink: Box::new(sink),
            speech: config.speech,
            active: AtomicBool::new(config.enabled),
        }
    }

    /// Play the cue for `event`, if any. Returns whether something played.
    pub fn handle(&self, event: &Event) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(interval_type) = event.cue() else {
            return false;
        };
        match CuePlan::for_interval(interval_type, self.speech) {
            Some(plan) => {
                self.sink.play(&plan);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn dispose(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for AudioCueEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCueEngine")
            .field("speech", &self.speech)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::IntervalType;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<CuePlan>>>);

    impl CueSink for Recorder {
        fn play(&self, plan: &CuePlan) {
            self.0.lock().unwrap().push(plan.clone());
        }
    }

    fn entered(interval_type: IntervalType) -> Event {
        Event::IntervalEntered {
            index: 1,
            interval_type,
            duration_secs: 60,
            skipped_over: 0,
            at: Utc::now(),
        }
    }

    #[test]
    fn plays_only_run_and_walk() {
        let recorder = Recorder::default();
        let engine = AudioCueEngine::init(recorder.clone(), &AudioConfig::default());
        assert!(engine.handle(&entered(IntervalType::Run)));
        assert!(engine.handle(&entered(IntervalType::Walk)));
        assert!(!engine.handle(&entered(IntervalType::Cooldown)));
        assert!(!engine.handle(&Event::TimerReset { at: Utc::now() }));
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn disposed_engine_is_silent() {
        let recorder = Recorder::default();
        let engine = AudioCueEngine::init(recorder.clone(), &AudioConfig::default());
        engine.dispose();
        assert!(!engine.handle(&entered(IntervalType::Run)));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn disabled_in_config_is_silent() {
        let config = AudioConfig {
            enabled: false,
            ..AudioConfig::default()
        };
        let engine = AudioCueEngine::init(Recorder::default(), &config);
        assert!(!engine.handle(&entered(IntervalType::Run)));
    }
}
