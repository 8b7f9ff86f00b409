//! Core error types for c25k-core.
//!
//! This module defines the error hierarchy using thiserror. Most of these
//! never reach the user: remote failures are absorbed by the offline queue
//! and malformed local data is reset to defaults. Authentication failures
//! are the exception and surface to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for c25k-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote synchronization errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Local key-value persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored blob could not be encoded or decoded
    #[error("Malformed blob under '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Could not resolve or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Remote completion store errors.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Remote store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote endpoint is not configured or invalid
    #[error("Invalid remote endpoint: {0}")]
    Endpoint(String),

    /// The operation requires a signed-in user
    #[error("Not signed in")]
    NotSignedIn,

    /// Failure reported by a non-HTTP backend
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

/// Authentication errors. These are shown to the user, never retried.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Sign-in rejected
    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    /// Emailed sign-in link is malformed or expired
    #[error("Invalid sign-in link: {0}")]
    InvalidLink(String),

    /// Stored session could not be read or written
    #[error("Session storage failed: {0}")]
    SessionStorage(#[from] StorageError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Workout id is not of the form `W{week}D{day}`
    #[error("Malformed workout id: {0}")]
    MalformedWorkoutId(String),

    /// Workout id is well formed but not part of the program
    #[error("Unknown workout: {0}")]
    UnknownWorkout(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
