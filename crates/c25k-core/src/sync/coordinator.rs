//! Reconciles the local progress cache with the remote completion store.
//!
//! Local writes always succeed first. Remote failures are absorbed by the
//! offline queue and retried later; only authentication errors reach the
//! caller.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::{AuthError, SyncError};
use crate::storage::{KeyValueStore, LocalProgressStore};
use crate::sync::auth::AuthProvider;
use crate::sync::remote::RemoteCompletionStore;
use crate::sync::types::{DrainReport, RecordOutcome, SyncReport, SyncStatus, WorkoutCompletion};

/// Sync coordinator over a remote store, an auth provider and the local store.
pub struct SyncCoordinator<R, A, S>
where
    R: RemoteCompletionStore,
    A: AuthProvider,
    S: KeyValueStore,
{
    remote: R,
    auth: A,
    local: Arc<LocalProgressStore<S>>,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
}

impl<R, A, S> SyncCoordinator<R, A, S>
where
    R: RemoteCompletionStore,
    A: AuthProvider,
    S: KeyValueStore,
{
    pub fn new(remote: R, auth: A, local: Arc<LocalProgressStore<S>>) -> Self {
        Self {
            remote,
            auth,
            local,
            last_sync_at: Mutex::new(None),
        }
    }

    pub fn local(&self) -> &LocalProgressStore<S> {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn mark_synced(&self) {
        *self.last_sync_at.lock().unwrap_or_else(|p| p.into_inner()) = Some(Utc::now());
    }

    /// Record a finished workout. Never fails: the local cache is updated
    /// first and a failed remote write is queued for retry.
    pub async fn record_completion(
        &self,
        workout_id: &str,
        duration_seconds: Option<u64>,
    ) -> RecordOutcome {
        self.record(WorkoutCompletion::new(workout_id, duration_seconds))
            .await
    }

    /// Same as [`record_completion`](Self::record_completion) with a
    /// caller-built completion.
    pub async fn record(&self, completion: WorkoutCompletion) -> RecordOutcome {
        if let Err(e) = self.local.save_completion(completion.clone()) {
            tracing::warn!(workout_id = %completion.workout_id, "local save failed: {e}");
        }

        let session = match self.auth.current_session() {
            Ok(Some(session)) => session,
            Ok(None) => return RecordOutcome::LocalOnly,
            Err(e) => {
                tracing::warn!("session lookup failed, keeping completion local: {e}");
                return RecordOutcome::LocalOnly;
            }
        };

        match self.remote.upsert(&session.user_id, &completion).await {
            Ok(()) => {
                self.mark_synced();
                match self.local.remove_superseded_from_queue(&completion) {
                    Ok(true) => tracing::debug!(
                        workout_id = %completion.workout_id,
                        "dropped stale queued completion"
                    ),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("failed to dequeue stale completion: {e}"),
                }
                tracing::debug!(workout_id = %completion.workout_id, "completion synced");
                RecordOutcome::Synced
            }
            Err(e) => {
                tracing::warn!(workout_id = %completion.workout_id, "remote write failed, queued: {e}");
                if let Err(e) = self.local.enqueue(completion) {
                    tracing::warn!("failed to queue completion: {e}");
                }
                RecordOutcome::Queued
            }
        }
    }

    /// Upload queued completions in insertion order. Each success removes
    /// its entry unless a newer completion replaced it meanwhile; failures
    /// stay queued.
    pub async fn process_sync_queue(&self, user_id: &str) -> DrainReport {
        let pending = self.local.queue();
        let mut synced = 0;

        for completion in pending.entries() {
            match self.remote.upsert(user_id, completion).await {
                Ok(()) => {
                    synced += 1;
                    match self.local.remove_from_queue_if_unchanged(completion) {
                        Ok(true) => {}
                        Ok(false) => tracing::debug!(
                            workout_id = %completion.workout_id,
                            "queue entry replaced during upload, keeping newer entry"
                        ),
                        Err(e) => tracing::warn!("failed to dequeue: {e}"),
                    }
                }
                Err(e) => {
                    tracing::warn!(workout_id = %completion.workout_id, "queued upload failed: {e}");
                }
            }
        }

        if synced > 0 {
            self.mark_synced();
        }
        let report = DrainReport {
            synced,
            remaining: self.local.queue().len(),
        };
        if !pending.is_empty() {
            tracing::info!(synced = report.synced, remaining = report.remaining, "sync queue processed");
        }
        report
    }

    /// Upload local completions the cloud does not have yet. Existing remote
    /// rows are never overwritten. Returns how many were uploaded.
    pub async fn migrate_local_to_cloud(&self, user_id: &str) -> Result<usize, SyncError> {
        let local = self.local.get_progress();
        if local.completions.is_empty() {
            return Ok(0);
        }

        let remote_ids: HashSet<String> = self
            .remote
            .fetch_all(user_id)
            .await?
            .into_iter()
            .map(|c| c.workout_id)
            .collect();

        let to_upload: Vec<_> = local
            .completions
            .into_iter()
            .filter(|c| !remote_ids.contains(&c.workout_id))
            .collect();
        if to_upload.is_empty() {
            return Ok(0);
        }

        self.remote.insert_missing(user_id, &to_upload).await?;
        tracing::info!(count = to_upload.len(), "migrated local completions");
        Ok(to_upload.len())
    }

    /// Reconcile after sign-in: migrate, drain the queue, then make the
    /// cloud state the local cache. If the final fetch fails the cache is
    /// kept as is.
    pub async fn sync_on_sign_in(&self, user_id: &str) -> SyncReport {
        let mut report = SyncReport::default();

        match self.migrate_local_to_cloud(user_id).await {
            Ok(n) => report.migrated = n,
            Err(e) => {
                tracing::warn!("migration failed: {e}");
                report.migration_failed = true;
            }
        }

        report.drained = self.process_sync_queue(user_id).await;

        match self.remote.fetch_all(user_id).await {
            Ok(cloud) => match self.local.replace_completions(cloud) {
                Ok(()) => {
                    report.cache_refreshed = true;
                    self.mark_synced();
                }
                Err(e) => tracing::warn!("failed to refresh local cache: {e}"),
            },
            Err(e) => tracing::warn!("cloud fetch failed, keeping local cache: {e}"),
        }

        report.local_count = self.local.get_progress().completions.len();
        tracing::info!(
            migrated = report.migrated,
            drained = report.drained.synced,
            still_queued = report.drained.remaining,
            cache_refreshed = report.cache_refreshed,
            "sign-in sync finished"
        );
        report
    }

    /// Start-up hook: drain the queue when someone is signed in.
    pub async fn attempt_queue_sync(&self) -> Result<Option<DrainReport>, AuthError> {
        match self.auth.current_session()? {
            Some(session) => Ok(Some(self.process_sync_queue(&session.user_id).await)),
            None => Ok(None),
        }
    }

    pub fn status(&self) -> Result<SyncStatus, AuthError> {
        let session = self.auth.current_session()?;
        Ok(SyncStatus {
            user_id: session.map(|s| s.user_id),
            pending_count: self.local.queue().len(),
            last_sync_at: *self.last_sync_at.lock().unwrap_or_else(|p| p.into_inner()),
        })
    }
}
