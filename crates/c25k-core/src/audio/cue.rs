use serde::{Deserialize, Serialize};

use crate::program::IntervalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueAction {
    Tone(Tone),
    Speak { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueStep {
    /// Delay from the start of the cue.
    pub offset_ms: u64,
    pub action: CueAction,
}

/// What to play when an interval begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuePlan {
    pub interval_type: IntervalType,
    pub steps: Vec<CueStep>,
}

impl CuePlan {
    /// Run: two short high beeps. Walk: one longer low beep.
    /// Returns `None` for intervals that are not announced.
    pub fn for_interval(interval_type: IntervalType, speech: bool) -> Option<Self> {
        let (mut steps, speak_at, word) = match interval_type {
            IntervalType::Run => (
                vec![tone(0, 800, 150), tone(200, 800, 150)],
                400,
                "Run",
            ),
            IntervalType::Walk => (vec![tone(0, 400, 300)], 300, "Walk"),
            IntervalType::Warmup | IntervalType::Cooldown => return None,
        };
        if speech {
            steps.push(CueStep {
                offset_ms: speak_at,
                action: CueAction::Speak { text: word.into() },
            });
        }
        Some(Self {
            interval_type,
            steps,
        })
    }

    pub fn spoken_text(&self) -> Option<&str> {
        self.steps.iter().find_map(|s| match &s.action {
            CueAction::Speak { text } => Some(text.as_str()),
            CueAction::Tone(_) => None,
        })
    }
}

fn tone(offset_ms: u64, frequency_hz: u32, duration_ms: u64) -> CueStep {
    CueStep {
        offset_ms,
        action: CueAction::Tone(Tone {
            frequency_hz,
            duration_ms,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_cue_is_two_high_beeps_then_speech() {
        let plan = CuePlan::for_interval(IntervalType::Run, true).unwrap();
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[1].offset_ms, 200);
        assert!(matches!(plan.steps[0].action, CueAction::Tone(Tone { frequency_hz: 800, .. })));
        assert_eq!(plan.spoken_text(), Some("Run"));
    }

    #[test]
    fn walk_cue_without_speech() {
        let plan = CuePlan::for_interval(IntervalType::Walk, false).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.spoken_text(), None);
    }

    #[test]
    fn warmup_and_cooldown_have_no_cue() {
        assert!(CuePlan::for_interval(IntervalType::Warmup, true).is_none());
        assert!(CuePlan::for_interval(IntervalType::Cooldown, true).is_none());
    }
}
