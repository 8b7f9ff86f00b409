//! Device-local progress cache and offline sync queue.
//!
//! Three blobs live in the key-value store:
//! - `c25k_progress`: `{"completions": [...]}`
//! - `c25k_sync_queue`: completions awaiting a remote write
//! - `c25k_completed`: legacy list of completed workout ids

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::kv::KeyValueStore;
use crate::error::StorageError;
use crate::program::{self, DAYS_PER_WEEK, WEEKS};
use crate::sync::{SyncQueue, WorkoutCompletion};

pub const PROGRESS_KEY: &str = "c25k_progress";
pub const QUEUE_KEY: &str = "c25k_sync_queue";
pub const LEGACY_COMPLETED_KEY: &str = "c25k_completed";

/// Cached completions, at most one per workout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalProgress {
    #[serde(default)]
    pub completions: Vec<WorkoutCompletion>,
}

impl LocalProgress {
    pub fn get(&self, workout_id: &str) -> Option<&WorkoutCompletion> {
        self.completions.iter().find(|c| c.workout_id == workout_id)
    }

    pub fn contains(&self, workout_id: &str) -> bool {
        self.get(workout_id).is_some()
    }

    /// Insert or replace by workout id. Replacement keeps the position.
    pub fn upsert(&mut self, completion: WorkoutCompletion) {
        match self
            .completions
            .iter_mut()
            .find(|c| c.workout_id == completion.workout_id)
        {
            Some(existing) => *existing = completion,
            None => self.completions.push(completion),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.completions.iter().map(|c| c.workout_id.clone()).collect()
    }
}

/// Completion state of one program week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekProgress {
    pub week: u32,
    pub completed_days: Vec<u32>,
}

impl WeekProgress {
    pub fn is_complete(&self) -> bool {
        self.completed_days.len() == DAYS_PER_WEEK as usize
    }
}

/// Derived view of the program as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
    pub weeks: Vec<WeekProgress>,
    /// First workout in program order that has no completion.
    pub next_workout: Option<String>,
}

impl ProgramProgress {
    pub fn from_progress(progress: &LocalProgress) -> Self {
        let all = program::workouts();
        let done = |id: &str| progress.contains(id);

        let completed = all.iter().filter(|w| done(&w.id().to_string())).count();
        let total = all.len();
        let percent = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64 * 1000.0).round() / 10.0
        };

        let weeks = (1..=WEEKS)
            .map(|week| WeekProgress {
                week,
                completed_days: program::workouts_for_week(week)
                    .filter(|w| done(&w.id().to_string()))
                    .map(|w| w.day)
                    .collect(),
            })
            .collect();

        let next_workout = all
            .iter()
            .map(|w| w.id().to_string())
            .find(|id| !done(id));

        Self {
            completed,
            total,
            percent,
            weeks,
            next_workout,
        }
    }
}

/// Owned access to the local blobs. Every read-modify-write runs under one
/// lock, so concurrent enqueue and dequeue never lose entries.
pub struct LocalProgressStore<S: KeyValueStore> {
    kv: Mutex<S>,
}

impl<S: KeyValueStore> LocalProgressStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv: Mutex::new(kv) }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.kv.lock().unwrap_or_else(|p| p.into_inner())
    }

    // -- progress --------------------------------------------------------

    pub fn get_progress(&self) -> LocalProgress {
        let kv = self.lock();
        load_progress(&*kv)
    }

    /// Upsert one completion (last write wins).
    pub fn save_completion(&self, completion: WorkoutCompletion) -> Result<(), StorageError> {
        let kv = self.lock();
        let mut progress = load_progress(&*kv);
        progress.upsert(completion);
        store_progress(&*kv, &progress)
    }

    /// Replace the whole cache, e.g. with the cloud state after sign-in.
    pub fn replace_completions(
        &self,
        completions: Vec<WorkoutCompletion>,
    ) -> Result<(), StorageError> {
        let mut progress = LocalProgress::default();
        for c in completions {
            progress.upsert(c);
        }
        let kv = self.lock();
        store_progress(&*kv, &progress)
    }

    pub fn clear_progress(&self) -> Result<(), StorageError> {
        let kv = self.lock();
        kv.remove(PROGRESS_KEY)?;
        kv.remove(LEGACY_COMPLETED_KEY)
    }

    pub fn is_completed(&self, workout_id: &str) -> bool {
        self.get_progress().contains(workout_id)
    }

    pub fn completed_ids(&self) -> Vec<String> {
        self.get_progress().ids()
    }

    pub fn program_progress(&self) -> ProgramProgress {
        ProgramProgress::from_progress(&self.get_progress())
    }

    // -- sync queue ------------------------------------------------------

    pub fn queue(&self) -> SyncQueue {
        let kv = self.lock();
        read_blob(&*kv, QUEUE_KEY)
    }

    /// Queue a completion for a later remote write, replacing any entry
    /// for the same workout in place.
    pub fn enqueue(&self, completion: WorkoutCompletion) -> Result<(), StorageError> {
        let kv = self.lock();
        let mut queue: SyncQueue = read_blob(&*kv, QUEUE_KEY);
        queue.enqueue(completion);
        write_blob(&*kv, QUEUE_KEY, &queue)
    }

    pub fn remove_from_queue(&self, workout_id: &str) -> Result<bool, StorageError> {
        let kv = self.lock();
        let mut queue: SyncQueue = read_blob(&*kv, QUEUE_KEY);
        if queue.remove(workout_id).is_none() {
            return Ok(false);
        }
        write_blob(&*kv, QUEUE_KEY, &queue)?;
        Ok(true)
    }

    /// Remove the entry only if it still equals `uploaded`.
    pub fn remove_from_queue_if_unchanged(
        &self,
        uploaded: &WorkoutCompletion,
    ) -> Result<bool, StorageError> {
        let kv = self.lock();
        let mut queue: SyncQueue = read_blob(&*kv, QUEUE_KEY);
        if !queue.remove_if_unchanged(uploaded) {
            return Ok(false);
        }
        write_blob(&*kv, QUEUE_KEY, &queue)?;
        Ok(true)
    }

    /// Drop a queued entry made stale by `synced` reaching the remote store.
    pub fn remove_superseded_from_queue(
        &self,
        synced: &WorkoutCompletion,
    ) -> Result<bool, StorageError> {
        let kv = self.lock();
        let mut queue: SyncQueue = read_blob(&*kv, QUEUE_KEY);
        if !queue.remove_superseded(synced) {
            return Ok(false);
        }
        write_blob(&*kv, QUEUE_KEY, &queue)?;
        Ok(true)
    }

    pub fn clear_queue(&self) -> Result<(), StorageError> {
        self.lock().remove(QUEUE_KEY)
    }

    /// Give the key-value store back.
    pub fn into_inner(self) -> S {
        self.kv.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

fn load_progress<S: KeyValueStore + ?Sized>(kv: &S) -> LocalProgress {
    match kv.get(PROGRESS_KEY) {
        Ok(Some(_)) => read_blob(kv, PROGRESS_KEY),
        Ok(None) => import_legacy(kv),
        Err(e) => {
            tracing::warn!("failed to read {PROGRESS_KEY}: {e}");
            LocalProgress::default()
        }
    }
}

/// Lift the old id-only list into completions with unknown duration.
fn import_legacy<S: KeyValueStore + ?Sized>(kv: &S) -> LocalProgress {
    let ids: Vec<String> = read_blob(kv, LEGACY_COMPLETED_KEY);
    if ids.is_empty() {
        return LocalProgress::default();
    }

    let now = Utc::now();
    let mut progress = LocalProgress::default();
    for id in ids {
        progress.upsert(WorkoutCompletion {
            workout_id: id,
            completed_at: now,
            duration_seconds: None,
        });
    }
    tracing::info!(
        count = progress.completions.len(),
        "imported legacy completed workouts"
    );
    if let Err(e) = write_blob(kv, PROGRESS_KEY, &progress) {
        tracing::warn!("failed to persist imported progress: {e}");
    }
    progress
}

fn store_progress<S: KeyValueStore + ?Sized>(
    kv: &S,
    progress: &LocalProgress,
) -> Result<(), StorageError> {
    write_blob(kv, PROGRESS_KEY, progress)?;
    write_blob(kv, LEGACY_COMPLETED_KEY, &progress.ids())
}

/// Read and decode a blob. Missing, unreadable or malformed blobs read as
/// the default value.
fn read_blob<T, S>(kv: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!("failed to read {key}: {e}");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(source) => {
            let err = StorageError::Malformed {
                key: key.to_string(),
                source,
            };
            tracing::warn!("{err}; resetting to empty");
            T::default()
        }
    }
}

fn write_blob<T, S>(kv: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Malformed {
        key: key.to_string(),
        source,
    })?;
    kv.set(key, &raw)
}
