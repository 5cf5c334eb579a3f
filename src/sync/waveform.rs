//! The ready/processed handshake pair guarding the shared waveform buffers.
//!
//! The capture thread downloads into the buffers, signals *ready*, then blocks on
//! *processed*. The consumer (render loop) owns the buffers between observing *ready*
//! and signalling *processed*. On the consumer side that window is a [`ReadWindow`]
//! guard, so "processed" is signalled exactly once per observed "ready", including on
//! early return or unwinding.
//!
//! ```
//! use scope_daq::sync::WaveformHandshake;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let handshake = Arc::new(WaveformHandshake::new());
//!
//! // Producer side (normally the capture thread)
//! handshake.ready().signal();
//!
//! // Consumer side
//! if let Some(window) = handshake.wait_ready_timeout(Duration::from_millis(10)) {
//!     // ... read buffers ...
//!     window.finish();
//! }
//! assert!(handshake.processed().is_signaled());
//! ```

use super::handshake::Handshake;
use std::time::Duration;
use tracing::trace;

/// Explicit handshake object shared by the capture coordinator and its consumer.
///
/// Construct once and hand an `Arc` to both sides.
#[derive(Debug, Default)]
pub struct WaveformHandshake {
    ready: Handshake,
    processed: Handshake,
}

impl WaveformHandshake {
    /// Create a pair with both signals idle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signalled by the producer once buffers are fully written.
    #[must_use]
    pub fn ready(&self) -> &Handshake {
        &self.ready
    }

    /// Signalled by the consumer once it has finished reading.
    #[must_use]
    pub fn processed(&self) -> &Handshake {
        &self.processed
    }

    /// Block until a waveform is ready and open the read window.
    pub fn wait_ready(&self) -> ReadWindow<'_> {
        self.ready.block();
        ReadWindow::open(self)
    }

    /// Open the read window only if a waveform is already ready.
    pub fn try_ready(&self) -> Option<ReadWindow<'_>> {
        self.ready.peek().then(|| ReadWindow::open(self))
    }

    /// Wait at most `timeout` for a waveform.
    pub fn wait_ready_timeout(&self, timeout: Duration) -> Option<ReadWindow<'_>> {
        self.ready
            .block_timeout(timeout)
            .then(|| ReadWindow::open(self))
    }

    /// Unconditionally signal *processed*.
    ///
    /// Used by teardown so a producer parked waiting for the consumer can observe
    /// shutdown. Coalescing makes this harmless when the producer is not waiting.
    pub fn release_producer(&self) {
        trace!("Releasing capture thread");
        self.processed.signal();
    }
}

/// Exclusive consumer access to the shared buffers for one capture.
///
/// Signals *processed* when finished or dropped.
#[derive(Debug)]
#[must_use = "dropping the window immediately hands the buffers back to the capture thread"]
pub struct ReadWindow<'a> {
    handshake: &'a WaveformHandshake,
}

impl<'a> ReadWindow<'a> {
    fn open(handshake: &'a WaveformHandshake) -> Self {
        trace!("Waveform read window opened");
        Self { handshake }
    }

    /// Close the window, allowing the next download to start.
    pub fn finish(self) {
        // Drop does the signalling
    }
}

impl Drop for ReadWindow<'_> {
    fn drop(&mut self) {
        self.handshake.processed.signal();
        trace!("Waveform read window closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_ready_without_signal() {
        let handshake = WaveformHandshake::new();
        assert!(handshake.try_ready().is_none());
        assert!(!handshake.processed().is_signaled());
    }

    #[test]
    fn test_window_signals_processed_once() {
        let handshake = WaveformHandshake::new();
        handshake.ready().signal();

        let window = handshake.try_ready().unwrap();
        assert!(!handshake.processed().is_signaled());
        window.finish();

        assert!(handshake.processed().peek());
        assert!(!handshake.processed().peek());
    }

    #[test]
    fn test_window_signals_on_drop() {
        let handshake = WaveformHandshake::new();
        handshake.ready().signal();
        {
            let _window = handshake.wait_ready();
        }
        assert!(handshake.processed().is_signaled());
    }

    #[test]
    fn test_wait_ready_timeout_expires() {
        let handshake = WaveformHandshake::new();
        assert!(handshake
            .wait_ready_timeout(Duration::from_millis(5))
            .is_none());
    }

    #[test]
    fn test_release_producer() {
        let handshake = WaveformHandshake::new();
        handshake.release_producer();
        handshake.release_producer();
        assert!(handshake.processed().peek());
        assert!(!handshake.processed().peek());
    }
}
