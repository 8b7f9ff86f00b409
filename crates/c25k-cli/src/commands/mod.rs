pub mod auth;
pub mod complete;
pub mod config;
pub mod progress;
pub mod run;
pub mod sync;
pub mod workouts;

use std::sync::Arc;

use c25k_core::program::{get_workout, Workout, WorkoutId};
use c25k_core::storage::{Database, LocalProgressStore};
use c25k_core::sync::{
    AuthProvider, HttpCompletionStore, KvSessionAuth, RecordOutcome, SyncCoordinator,
    WorkoutCompletion,
};
use c25k_core::{Config, ValidationError};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub type Coordinator = SyncCoordinator<HttpCompletionStore, KvSessionAuth<Database>, Database>;

pub fn open_local() -> Result<Arc<LocalProgressStore<Database>>, Box<dyn std::error::Error>> {
    Ok(Arc::new(LocalProgressStore::new(Database::open()?)))
}

pub fn open_auth() -> Result<KvSessionAuth<Database>, Box<dyn std::error::Error>> {
    Ok(KvSessionAuth::new(Database::open()?))
}

/// Coordinator for the configured remote, or `None` when sync is disabled.
pub fn coordinator(
    config: &Config,
    local: Arc<LocalProgressStore<Database>>,
) -> Result<Option<Coordinator>, Box<dyn std::error::Error>> {
    if !config.remote.is_configured() {
        return Ok(None);
    }
    let auth = open_auth()?;
    let mut remote = HttpCompletionStore::new(&config.remote)?;
    if let Some(session) = auth.current_session()? {
        remote = remote.with_access_token(session.access_token);
    }
    Ok(Some(SyncCoordinator::new(remote, auth, local)))
}

/// Parse and look up a workout id such as `W3D2`.
pub fn find_workout(id: &str) -> Result<&'static Workout, ValidationError> {
    let parsed: WorkoutId = id.parse()?;
    get_workout(parsed).ok_or_else(|| ValidationError::UnknownWorkout(id.to_string()))
}

/// Record a completion through the coordinator if sync is configured,
/// otherwise only locally.
pub fn record(
    config: &Config,
    completion: WorkoutCompletion,
) -> Result<RecordOutcome, Box<dyn std::error::Error>> {
    let local = open_local()?;
    match coordinator(config, Arc::clone(&local))? {
        Some(coordinator) => {
            let rt = runtime()?;
            Ok(rt.block_on(coordinator.record(completion)))
        }
        None => {
            local.save_completion(completion)?;
            Ok(RecordOutcome::LocalOnly)
        }
    }
}

pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

pub fn format_secs(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn describe_outcome(outcome: RecordOutcome) -> &'static str {
    match outcome {
        RecordOutcome::Synced => "saved and synced",
        RecordOutcome::Queued => "saved; sync queued for retry",
        RecordOutcome::LocalOnly => "saved locally",
    }
}
