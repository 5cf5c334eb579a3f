//! Process-wide shutdown flag.
//!
//! [`ShutdownFlag`] is the writable half held by teardown code. The capture thread
//! only ever receives a [`ShutdownWatch`], which can read the flag but not set it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set-once shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Read-only view for the capture thread.
    #[must_use]
    pub fn watch(&self) -> ShutdownWatch {
        ShutdownWatch {
            flag: Arc::clone(&self.flag),
        }
    }
}

/// Read-only view of a [`ShutdownFlag`].
#[derive(Debug, Clone)]
pub struct ShutdownWatch {
    flag: Arc<AtomicBool>,
}

impl ShutdownWatch {
    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_observes_trigger() {
        let flag = ShutdownFlag::new();
        let watch = flag.watch();
        assert!(!watch.is_set());

        flag.clone().trigger();
        assert!(watch.is_set());
        assert!(flag.is_set());
    }
}
