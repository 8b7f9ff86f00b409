//! # C25K Core Library
//!
//! Core logic for a Couch-to-5K companion: the nine-week program, an
//! interval timer that stays accurate when its host is suspended, a local
//! progress cache with offline sync to a remote store, and audio cues.
//! The `c25k` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Program**: static catalog of 27 workouts
//! - **Timer**: wall-clock recompute engine plus a tokio runner
//! - **Storage**: SQLite key-value blobs and TOML configuration
//! - **Sync**: local-first completion recording with an offline queue
//! - **Audio**: cue plans for run and walk intervals
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Pure timer state machine
//! - [`TimerRunner`]: Periodic driver with foreground catch-up
//! - [`LocalProgressStore`]: Progress cache and sync queue
//! - [`SyncCoordinator`]: Local/remote reconciliation
//! - [`Config`]: Application configuration management

pub mod audio;
pub mod error;
pub mod events;
pub mod program;
pub mod storage;
pub mod sync;
pub mod timer;

pub use audio::{AudioCueEngine, CuePlan, CueSink};
pub use error::{AuthError, ConfigError, CoreError, StorageError, SyncError, ValidationError};
pub use events::Event;
pub use program::{Interval, IntervalType, Workout, WorkoutId};
pub use storage::{Config, Database, KeyValueStore, LocalProgressStore, MemoryKv, ProgramProgress};
pub use sync::{RecordOutcome, SyncCoordinator, WorkoutCompletion};
pub use timer::{Clock, SystemClock, TimerEngine, TimerRunner, TimerState};
