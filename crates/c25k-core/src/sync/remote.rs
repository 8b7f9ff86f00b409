//! Remote completion store abstraction and an in-process implementation.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use crate::error::SyncError;
use crate::sync::types::WorkoutCompletion;

/// Per-user completion table, keyed by `(user, workout_id)`.
pub trait RemoteCompletionStore: Send + Sync {
    /// Insert or overwrite the completion for `(user_id, workout_id)`.
    fn upsert(
        &self,
        user_id: &str,
        completion: &WorkoutCompletion,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Insert completions whose key does not exist yet. Existing rows are
    /// never overwritten.
    fn insert_missing(
        &self,
        user_id: &str,
        completions: &[WorkoutCompletion],
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// All completions of `user_id`, newest `completed_at` first.
    fn fetch_all(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<WorkoutCompletion>, SyncError>> + Send;
}

/// Operation names used for failure scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    Upsert,
    InsertMissing,
    FetchAll,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<(String, WorkoutCompletion)>,
    /// Scripted outcomes consumed one per call; `true` fails the call.
    script: VecDeque<(RemoteOp, bool)>,
    offline: bool,
    calls: Vec<(RemoteOp, String)>,
}

/// Remote store held in memory. Failures can be scripted per call or the
/// whole store taken offline.
#[derive(Debug, Default)]
pub struct MemoryCompletionStore {
    state: Mutex<MemoryState>,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Fail every call until set back to `false`.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Queue the outcome of the next call of `op`.
    pub fn script(&self, op: RemoteOp, fail: bool) {
        self.state().script.push_back((op, fail));
    }

    /// Rows of `user_id`, in insertion order.
    pub fn rows(&self, user_id: &str) -> Vec<WorkoutCompletion> {
        self.state()
            .rows
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Every call made so far with the workout id (or user id) it touched.
    pub fn calls(&self) -> Vec<(RemoteOp, String)> {
        self.state().calls.clone()
    }

    fn check(state: &mut MemoryState, op: RemoteOp) -> Result<(), SyncError> {
        if state.offline {
            return Err(SyncError::Unavailable("offline".into()));
        }
        let scripted = state.script.iter().position(|(o, _)| *o == op);
        if let Some(fail) = scripted.and_then(|i| state.script.remove(i)).map(|(_, f)| f) {
            if fail {
                return Err(SyncError::Unavailable(format!("scripted {op:?} failure")));
            }
        }
        Ok(())
    }
}

impl RemoteCompletionStore for MemoryCompletionStore {
    async fn upsert(&self, user_id: &str, completion: &WorkoutCompletion) -> Result<(), SyncError> {
        let mut state = self.state();
        state
            .calls
            .push((RemoteOp::Upsert, completion.workout_id.clone()));
        Self::check(&mut state, RemoteOp::Upsert)?;

        let existing = state
            .rows
            .iter_mut()
            .find(|(u, c)| u == user_id && c.workout_id == completion.workout_id);
        match existing {
            Some((_, row)) => *row = completion.clone(),
            None => state.rows.push((user_id.to_string(), completion.clone())),
        }
        Ok(())
    }

    async fn insert_missing(
        &self,
        user_id: &str,
        completions: &[WorkoutCompletion],
    ) -> Result<(), SyncError> {
        let mut state = self.state();
        state
            .calls
            .push((RemoteOp::InsertMissing, user_id.to_string()));
        Self::check(&mut state, RemoteOp::InsertMissing)?;

        for completion in completions {
            let exists = state
                .rows
                .iter()
                .any(|(u, c)| u == user_id && c.workout_id == completion.workout_id);
            if !exists {
                state.rows.push((user_id.to_string(), completion.clone()));
            }
        }
        Ok(())
    }

    async fn fetch_all(&self, user_id: &str) -> Result<Vec<WorkoutCompletion>, SyncError> {
        let mut state = self.state();
        state.calls.push((RemoteOp::FetchAll, user_id.to_string()));
        Self::check(&mut state, RemoteOp::FetchAll)?;

        let mut rows: Vec<_> = state
            .rows
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, c)| c.clone())
            .collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(rows)
    }
}
