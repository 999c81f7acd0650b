//! Observable reload status
//!
//! Owned by each service instance, so two services in one process never
//! share the flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// "Reloading" flag exposed for health and readiness reporting
#[derive(Debug, Default)]
pub struct ReloadStatus {
    reloading: AtomicBool,
}

impl ReloadStatus {
    /// True while a reconciliation is removing or creating destinations
    pub fn is_reloading(&self) -> bool {
        self.reloading.load(Ordering::Acquire)
    }

    /// Mark reloading until the guard drops
    pub(crate) fn begin(&self) -> ReloadingGuard<'_> {
        self.reloading.store(true, Ordering::Release);
        ReloadingGuard { status: self }
    }
}

/// Clears the flag on drop
pub(crate) struct ReloadingGuard<'a> {
    status: &'a ReloadStatus,
}

impl Drop for ReloadingGuard<'_> {
    fn drop(&mut self) {
        self.status.reloading.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_scopes_flag() {
        let status = ReloadStatus::default();
        assert!(!status.is_reloading());
        {
            let _guard = status.begin();
            assert!(status.is_reloading());
        }
        assert!(!status.is_reloading());
    }
}
