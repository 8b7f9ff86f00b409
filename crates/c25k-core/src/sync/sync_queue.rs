//! Offline queue of completions waiting for a remote write.

use serde::{Deserialize, Serialize};

use crate::sync::types::WorkoutCompletion;

/// Ordered queue holding at most one entry per workout.
///
/// Enqueuing a workout that is already queued replaces the entry in place,
/// so the queue keeps first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncQueue {
    entries: Vec<WorkoutCompletion>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a completion. Returns true if it replaced an existing entry.
    pub fn enqueue(&mut self, completion: WorkoutCompletion) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|c| c.workout_id == completion.workout_id)
        {
            Some(existing) => {
                *existing = completion;
                true
            }
            None => {
                self.entries.push(completion);
                false
            }
        }
    }

    pub fn remove(&mut self, workout_id: &str) -> Option<WorkoutCompletion> {
        let pos = self.entries.iter().position(|c| c.workout_id == workout_id)?;
        Some(self.entries.remove(pos))
    }

    /// Remove `completion` only if the queue still holds exactly it. A newer
    /// completion queued for the same workout while an upload was in flight
    /// stays queued.
    pub fn remove_if_unchanged(&mut self, completion: &WorkoutCompletion) -> bool {
        match self.entries.iter().position(|c| c == completion) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop the queued entry for the same workout when `synced` is at
    /// least as recent. A newer queued entry is kept.
    pub fn remove_superseded(&mut self, synced: &WorkoutCompletion) -> bool {
        match self.entries.iter().position(|c| {
            c.workout_id == synced.workout_id && c.completed_at <= synced.completed_at
        }) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, workout_id: &str) -> Option<&WorkoutCompletion> {
        self.entries.iter().find(|c| c.workout_id == workout_id)
    }

    pub fn entries(&self) -> &[WorkoutCompletion] {
        &self.entries
    }

    /// Get number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
