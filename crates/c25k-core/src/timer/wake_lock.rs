//! Scoped screen wake lock.
//!
//! The platform resource is held by a [`WakeLockGuard`] and released when
//! the guard drops, so teardown paths that never reach an explicit release
//! still give it back.

use std::sync::Arc;

/// Platform capability that keeps the display awake.
pub trait WakeLockProvider: Send + Sync {
    /// Returns false when the platform refuses; the session runs anyway.
    fn acquire(&self) -> bool;
    fn release(&self);
}

/// For hosts without a wake lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWakeLock;

impl WakeLockProvider for NoWakeLock {
    fn acquire(&self) -> bool {
        false
    }

    fn release(&self) {}
}

pub struct WakeLockGuard {
    provider: Arc<dyn WakeLockProvider>,
}

impl WakeLockGuard {
    /// Acquire the lock, or `None` if the platform refused.
    pub fn acquire(provider: &Arc<dyn WakeLockProvider>) -> Option<Self> {
        if provider.acquire() {
            tracing::debug!("wake lock acquired");
            Some(Self {
                provider: Arc::clone(provider),
            })
        } else {
            tracing::debug!("wake lock unavailable");
            None
        }
    }
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.provider.release();
        tracing::debug!("wake lock released");
    }
}

impl std::fmt::Debug for WakeLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeLockGuard").finish_non_exhaustive()
    }
}
