use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    Warmup,
    Run,
    Walk,
    Cooldown,
}

impl IntervalType {
    /// Run and walk intervals are announced with an audio cue;
    /// warmup and cooldown are not.
    pub fn is_cued(&self) -> bool {
        matches!(self, IntervalType::Run | IntervalType::Walk)
    }

    pub fn label(&self) -> &'static str {
        match self {
            IntervalType::Warmup => "Warm Up",
            IntervalType::Run => "Run",
            IntervalType::Walk => "Walk",
            IntervalType::Cooldown => "Cool Down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    #[serde(rename = "type")]
    pub interval_type: IntervalType,
    pub duration_seconds: u64,
}

impl Interval {
    pub const fn new(interval_type: IntervalType, duration_seconds: u64) -> Self {
        Self {
            interval_type,
            duration_seconds,
        }
    }

    /// Get interval duration in milliseconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn duration_ms(&self) -> u64 {
        self.duration_seconds.saturating_mul(1000)
    }
}

/// Identity of a workout in the program, serialized as `W{week}D{day}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkoutId {
    pub week: u32,
    pub day: u32,
}

impl WorkoutId {
    pub const fn new(week: u32, day: u32) -> Self {
        Self { week, day }
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}D{}", self.week, self.day)
    }
}

impl FromStr for WorkoutId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedWorkoutId(s.to_string());

        let rest = s.strip_prefix('W').ok_or_else(malformed)?;
        let (week, day) = rest.split_once('D').ok_or_else(malformed)?;
        let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(week) || !all_digits(day) {
            return Err(malformed());
        }

        Ok(Self {
            week: week.parse().map_err(|_| malformed())?,
            day: day.parse().map_err(|_| malformed())?,
        })
    }
}

impl Serialize for WorkoutId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WorkoutId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One day of the program: an ordered, non-empty run of intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workout {
    pub week: u32,
    pub day: u32,
    pub intervals: Vec<Interval>,
}

impl Workout {
    pub fn id(&self) -> WorkoutId {
        WorkoutId::new(self.week, self.day)
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.intervals.iter().map(|i| i.duration_seconds).sum()
    }

    /// Cumulative seconds before (but not including) `index`.
    pub fn interval_start_offset(&self, index: usize) -> u64 {
        self.intervals
            .iter()
            .take(index)
            .map(|i| i.duration_seconds)
            .sum()
    }

    pub fn run_count(&self) -> usize {
        self.intervals
            .iter()
            .filter(|i| i.interval_type == IntervalType::Run)
            .count()
    }

    /// Total running seconds, excluding walks and warmup/cooldown.
    pub fn run_secs(&self) -> u64 {
        self.intervals
            .iter()
            .filter(|i| i.interval_type == IntervalType::Run)
            .map(|i| i.duration_seconds)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workout_id_display() {
        assert_eq!(WorkoutId::new(1, 1).to_string(), "W1D1");
        assert_eq!(WorkoutId::new(9, 3).to_string(), "W9D3");
    }

    #[test]
    fn workout_id_parse() {
        assert_eq!("W4D2".parse::<WorkoutId>().unwrap(), WorkoutId::new(4, 2));
        assert_eq!("W10D12".parse::<WorkoutId>().unwrap(), WorkoutId::new(10, 12));
    }

    #[test]
    fn workout_id_rejects_malformed() {
        for bad in ["", "W", "WD", "W1", "D1", "w1d1", "W1D", "WxD1", "W1D1x", " W1D1", "W-1D1"] {
            assert!(bad.parse::<WorkoutId>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn workout_id_serializes_as_string() {
        let json = serde_json::to_string(&WorkoutId::new(2, 3)).unwrap();
        assert_eq!(json, "\"W2D3\"");
        let back: WorkoutId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WorkoutId::new(2, 3));
    }

    #[test]
    fn interval_serializes_camel_case() {
        let json = serde_json::to_value(Interval::new(IntervalType::Run, 60)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "run", "durationSeconds": 60}));
    }

    #[test]
    fn only_run_and_walk_are_cued() {
        assert!(IntervalType::Run.is_cued());
        assert!(IntervalType::Walk.is_cued());
        assert!(!IntervalType::Warmup.is_cued());
        assert!(!IntervalType::Cooldown.is_cued());
    }
}
