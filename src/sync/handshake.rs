//! Binary auto-resetting handshake signal.
//!
//! A [`Handshake`] has two states, idle and signaled. [`signal`](Handshake::signal)
//! never blocks; [`block`](Handshake::block) waits for the signaled state and consumes
//! it. Signals are *coalesced*: any number of `signal()` calls between two waits
//! produce exactly one wake-up.
//!
//! # Cardinality
//!
//! One producer and one consumer per instance. With several threads in `block()`
//! only one of them is woken per signal and which one is unspecified; this type does
//! not attempt to support that pattern. Fan-out needs a counting primitive instead.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Binary, non-counting, auto-resetting cross-thread signal.
#[derive(Debug, Default)]
pub struct Handshake {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl Handshake {
    /// Create a handshake in the idle state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Mark the handshake signaled and wake the waiter, if any.
    ///
    /// Has no additional effect when already signaled.
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            *signaled = true;
            self.condvar.notify_one();
        }
    }

    /// Wait until signaled, then reset to idle.
    ///
    /// Returns immediately if a signal is already pending.
    pub fn block(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.condvar.wait(&mut signaled);
        }
        *signaled = false;
    }

    /// Wait at most `timeout` for a signal.
    ///
    /// Returns `true` (and resets to idle) if the signal was consumed, `false` on timeout.
    pub fn block_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self.condvar.wait_until(&mut signaled, deadline).timed_out() {
                break;
            }
        }
        std::mem::replace(&mut *signaled, false)
    }

    /// Consume a pending signal without waiting.
    ///
    /// Returns `true` if the handshake was signaled (it is now idle).
    pub fn peek(&self) -> bool {
        std::mem::replace(&mut *self.signaled.lock(), false)
    }

    /// Whether a signal is pending. Does not consume it.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_signal_then_block_returns_immediately() {
        let handshake = Handshake::new();
        handshake.signal();
        handshake.block();
        assert!(!handshake.is_signaled());
    }

    #[test]
    fn test_block_waits_for_signal() {
        let handshake = Arc::new(Handshake::new());
        let woke = Arc::new(AtomicBool::new(false));

        let waiter = {
            let handshake = Arc::clone(&handshake);
            let woke = Arc::clone(&woke);
            thread::spawn(move || {
                handshake.block();
                woke.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!woke.load(Ordering::SeqCst), "block() returned without a signal");

        handshake.signal();
        waiter.join().unwrap();
        assert!(woke.load(Ordering::SeqCst));
    }

    #[test]
    fn test_signals_coalesce() {
        let handshake = Handshake::new();
        handshake.signal();
        handshake.signal();

        assert!(handshake.block_timeout(Duration::from_millis(10)));
        // The second signal was not queued
        assert!(!handshake.block_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_block_timeout_expires() {
        let handshake = Handshake::new();
        let start = Instant::now();
        assert!(!handshake.block_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_peek_consumes() {
        let handshake = Handshake::new();
        assert!(!handshake.peek());
        handshake.signal();
        assert!(handshake.is_signaled());
        assert!(handshake.peek());
        assert!(!handshake.peek());
    }

    #[test]
    fn test_ping_pong() {
        let ping = Arc::new(Handshake::new());
        let pong = Arc::new(Handshake::new());

        let responder = {
            let ping = Arc::clone(&ping);
            let pong = Arc::clone(&pong);
            thread::spawn(move || {
                for _ in 0..100 {
                    ping.block();
                    pong.signal();
                }
            })
        };

        for _ in 0..100 {
            ping.signal();
            pong.block();
        }
        responder.join().unwrap();
    }
}
