mod clock;
mod engine;
mod runner;
mod wake_lock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{locate, Position, TimerEngine, TimerState};
pub use runner::{TimerRunner, DEFAULT_POLL_INTERVAL};
pub use wake_lock::{NoWakeLock, WakeLockGuard, WakeLockProvider};
