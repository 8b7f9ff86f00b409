//! Integration tests for local-first completion sync.

use std::sync::Arc;

use c25k_core::storage::{Database, LocalProgressStore, MemoryKv};
use c25k_core::sync::{
    KvSessionAuth, MemoryCompletionStore, RecordOutcome, RemoteCompletionStore, RemoteOp, Session,
    SyncCoordinator, WorkoutCompletion,
};
use chrono::{Duration, Utc};

type Coordinator<S> = SyncCoordinator<MemoryCompletionStore, KvSessionAuth<MemoryKv>, S>;

fn signed_in_auth(user: &str) -> KvSessionAuth<MemoryKv> {
    let auth = KvSessionAuth::new(MemoryKv::new());
    auth.sign_in(Session {
        user_id: user.into(),
        access_token: "token".into(),
        email: None,
        expires_at: None,
    })
    .unwrap();
    auth
}

fn coordinator() -> Coordinator<MemoryKv> {
    SyncCoordinator::new(
        MemoryCompletionStore::new(),
        signed_in_auth("runner"),
        Arc::new(LocalProgressStore::new(MemoryKv::new())),
    )
}

#[tokio::test]
async fn test_recording_twice_keeps_one_completion() {
    let c = coordinator();
    assert_eq!(c.record_completion("W3D2", Some(1490)).await, RecordOutcome::Synced);
    assert_eq!(c.record_completion("W3D2", Some(1502)).await, RecordOutcome::Synced);

    let local = c.local().get_progress();
    assert_eq!(local.completions.len(), 1);
    assert_eq!(local.completions[0].duration_seconds, Some(1502));

    let remote = c.remote().rows("runner");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].duration_seconds, Some(1502));
}

#[tokio::test]
async fn test_newer_synced_write_is_not_overwritten_by_queued_one() {
    let c = coordinator();
    c.remote().script(RemoteOp::Upsert, true);
    assert_eq!(c.record_completion("W1D1", Some(100)).await, RecordOutcome::Queued);
    assert_eq!(c.record_completion("W1D1", Some(200)).await, RecordOutcome::Synced);
    assert!(c.local().queue().is_empty());

    let report = c.process_sync_queue("runner").await;
    assert_eq!(report.synced, 0);
    assert_eq!(report.remaining, 0);
    assert_eq!(c.remote().rows("runner")[0].duration_seconds, Some(200));

    let report = c.sync_on_sign_in("runner").await;
    assert!(report.cache_refreshed);
    let local = c.local().get_progress();
    assert_eq!(local.get("W1D1").unwrap().duration_seconds, Some(200));
}

#[tokio::test]
async fn test_queue_drain_with_partial_failure() {
    let c = coordinator();
    c.remote().set_offline(true);
    for id in ["W1D1", "W1D2", "W1D3", "W2D1", "W2D2"] {
        assert_eq!(c.record_completion(id, None).await, RecordOutcome::Queued);
    }
    assert_eq!(c.status().unwrap().pending_count, 5);
    c.remote().set_offline(false);

    // Second and fourth uploads fail.
    for fail in [false, true, false, true, false] {
        c.remote().script(RemoteOp::Upsert, fail);
    }
    let report = c.process_sync_queue("runner").await;
    assert_eq!(report.synced, 3);
    assert_eq!(report.remaining, 2);

    let left: Vec<_> = c
        .local()
        .queue()
        .entries()
        .iter()
        .map(|e| e.workout_id.clone())
        .collect();
    assert_eq!(left, vec!["W1D2", "W2D1"]);

    let report = c.process_sync_queue("runner").await;
    assert_eq!(report.remaining, 0);
    assert_eq!(c.remote().rows("runner").len(), 5);
}

#[tokio::test]
async fn test_migration_uploads_only_missing_workouts() {
    let c = coordinator();
    let cloud_copy = WorkoutCompletion::new("W1D1", Some(1800));
    c.local()
        .save_completion(WorkoutCompletion::new("W1D1", Some(1700)))
        .unwrap();
    c.local()
        .save_completion(WorkoutCompletion::new("W1D2", Some(1705)))
        .unwrap();

    // The cloud already has W1D1 from another device.
    c.remote().upsert("runner", &cloud_copy).await.unwrap();

    let migrated = c.migrate_local_to_cloud("runner").await.unwrap();
    assert_eq!(migrated, 1);

    let rows = c.remote().rows("runner");
    assert_eq!(rows.len(), 2);
    let w1d1 = rows.iter().find(|r| r.workout_id == "W1D1").unwrap();
    assert_eq!(w1d1.duration_seconds, Some(1800));
}

#[tokio::test]
async fn test_sign_in_sync_makes_cloud_authoritative() {
    let c = coordinator();
    let now = Utc::now();

    let mut remote_only = WorkoutCompletion::new("W2D3", Some(1740));
    remote_only.completed_at = now - Duration::days(2);
    c.remote().upsert("runner", &remote_only).await.unwrap();

    c.local()
        .save_completion(WorkoutCompletion::new("W1D1", None))
        .unwrap();
    c.local()
        .enqueue(WorkoutCompletion::new("W1D2", Some(1710)))
        .unwrap();

    let report = c.sync_on_sign_in("runner").await;
    assert_eq!(report.migrated, 1);
    assert_eq!(report.drained.synced, 1);
    assert_eq!(report.drained.remaining, 0);
    assert!(report.cache_refreshed);
    assert_eq!(report.local_count, 3);

    let mut ids = c.local().completed_ids();
    ids.sort();
    assert_eq!(ids, vec!["W1D1", "W1D2", "W2D3"]);
}

#[tokio::test]
async fn test_sqlite_backed_store_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("c25k.db");

    {
        let local = Arc::new(LocalProgressStore::new(Database::open_at(&path).unwrap()));
        let c = SyncCoordinator::new(MemoryCompletionStore::new(), signed_in_auth("runner"), local);
        c.remote().set_offline(true);
        assert_eq!(c.record_completion("W5D3", Some(1810)).await, RecordOutcome::Queued);
    }

    let local = LocalProgressStore::new(Database::open_at(&path).unwrap());
    assert!(local.is_completed("W5D3"));
    assert_eq!(local.queue().len(), 1);
    assert_eq!(local.program_progress().completed, 1);
}
