mod config;
pub mod database;
pub mod kv;
pub mod progress;

pub use config::{AudioConfig, Config, RemoteConfig, TimerConfig};
pub use database::Database;
pub use kv::{KeyValueStore, MemoryKv};
pub use progress::{LocalProgress, LocalProgressStore, ProgramProgress, WeekProgress};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/c25k[-dev]/` based on C25K_ENV.
///
/// Set C25K_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("C25K_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("c25k-dev")
    } else {
        base_dir.join("c25k")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
