//! Core types for progress synchronization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::program::{get_workout_by_id, Workout};

/// A record that the user finished a workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutCompletion {
    /// `W{week}D{day}`.
    pub workout_id: String,
    pub completed_at: DateTime<Utc>,
    /// `None` means the duration is unknown, not zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl WorkoutCompletion {
    pub fn new(workout_id: impl Into<String>, duration_seconds: Option<u64>) -> Self {
        Self {
            workout_id: workout_id.into(),
            completed_at: Utc::now(),
            duration_seconds,
        }
    }

    pub fn workout(&self) -> Option<&'static Workout> {
        get_workout_by_id(&self.workout_id)
    }
}

/// The signed-in identity, as handed out by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// What happened to a recorded completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Stored locally and remotely.
    Synced,
    /// Stored locally; the remote write failed and was queued.
    Queued,
    /// Stored locally; nobody is signed in.
    LocalOnly,
}

/// Result of one pass over the offline queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub synced: usize,
    pub remaining: usize,
}

/// Result of the sign-in reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Local completions uploaded because the cloud lacked them.
    pub migrated: usize,
    /// Migration could not run (remote listing or insert failed).
    pub migration_failed: bool,
    pub drained: DrainReport,
    /// Local cache was replaced by the cloud state.
    pub cache_refreshed: bool,
    /// Completions in the local cache afterwards.
    pub local_count: usize,
}

/// Current sync status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub user_id: Option<String>,
    /// Number of completions waiting for a remote write.
    pub pending_count: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_serializes_like_the_web_client() {
        let c = WorkoutCompletion {
            workout_id: "W1D1".into(),
            completed_at: "2025-03-01T07:30:00Z".parse().unwrap(),
            duration_seconds: Some(1712),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["workoutId"], "W1D1");
        assert_eq!(json["completedAt"], "2025-03-01T07:30:00Z");
        assert_eq!(json["durationSeconds"], 1712);
    }

    #[test]
    fn missing_duration_is_unknown() {
        let c: WorkoutCompletion =
            serde_json::from_str(r#"{"workoutId":"W2D1","completedAt":"2025-03-01T07:30:00Z"}"#)
                .unwrap();
        assert_eq!(c.duration_seconds, None);
        assert!(c.workout().is_some());
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("durationSeconds").is_none());
    }

    #[test]
    fn session_expiry() {
        let now = Utc::now();
        let mut s = Session {
            user_id: "u".into(),
            access_token: "t".into(),
            email: None,
            expires_at: None,
        };
        assert!(!s.is_expired(now));
        s.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(s.is_expired(now));
    }
}
