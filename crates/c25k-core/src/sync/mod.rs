//! Progress synchronization.
//!
//! Keeps the device-local progress cache and a per-user remote completion
//! table in step. Completions are always written locally first; a remote
//! write that fails is queued and retried on the next sync.

pub mod auth;
pub mod coordinator;
pub mod http;
pub mod remote;
pub mod sync_queue;
pub mod types;

pub use auth::{expiry_after, AuthProvider, KvSessionAuth, SESSION_KEY};
pub use coordinator::SyncCoordinator;
pub use http::HttpCompletionStore;
pub use remote::{MemoryCompletionStore, RemoteCompletionStore, RemoteOp};
pub use sync_queue::SyncQueue;
pub use types::{DrainReport, RecordOutcome, Session, SyncReport, SyncStatus, WorkoutCompletion};
