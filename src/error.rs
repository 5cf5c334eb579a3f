//! Custom error types for the crate.
//!
//! `ScopeError` is the single error type surfaced by the library. It is built with
//! `thiserror`, so underlying errors convert with `?` where a `#[from]` exists.
//!
//! ## Error Hierarchy
//!
//! - **`PositionOutOfRange`**: A caller asked the stream registry to remove a row that
//!   does not exist. This is a contract violation by the caller; the registry is left
//!   untouched.
//! - **`InvalidStream`**: A stream descriptor was requested for an output index the
//!   channel does not expose.
//! - **`Config`** / **`Configuration`**: Extraction failures from `figment` and
//!   semantic validation failures respectively.
//! - **`Tracing`**: The logging subscriber could not be installed.
//! - **`ThreadSpawn`** / **`CaptureThreadPanicked`**: Lifecycle failures of the
//!   background capture thread.
//!
//! Note what is *not* here: an instrument reporting "no data yet" is a normal poll
//! outcome, adding a duplicate stream is a silent no-op, and handshake signals cannot
//! fail. Channel reference-count underflow has no variant because it cannot be
//! expressed through the public API.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, ScopeError>;

/// Primary error type for scope capture and stream tracking.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// `remove` was called with a position past the end of the registry.
    #[error("Stream position {position} out of range (registry holds {len} streams)")]
    PositionOutOfRange {
        /// Requested row
        position: usize,
        /// Number of rows at the time of the call
        len: usize,
    },

    /// A descriptor was requested for a stream index the channel does not have.
    #[error("Channel '{channel}' has no stream {stream} ({count} available)")]
    InvalidStream {
        /// Display name of the channel
        channel: String,
        /// Requested stream index
        stream: usize,
        /// Number of streams the channel exposes
        count: usize,
    },

    /// Configuration sources could not be merged or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but holds semantically invalid values.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The tracing subscriber could not be installed.
    #[error("Tracing initialisation failed: {0}")]
    Tracing(String),

    /// The OS refused to start the capture thread.
    #[error("Failed to spawn capture thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The capture thread terminated by panicking.
    #[error("Capture thread panicked")]
    CaptureThreadPanicked,
}

impl From<figment::Error> for ScopeError {
    fn from(err: figment::Error) -> Self {
        ScopeError::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = ScopeError::PositionOutOfRange {
            position: 4,
            len: 2,
        };
        assert_eq!(
            err.to_string(),
            "Stream position 4 out of range (registry holds 2 streams)"
        );
    }

    #[test]
    fn test_invalid_stream_message() {
        let err = ScopeError::InvalidStream {
            channel: "CH1".into(),
            stream: 3,
            count: 1,
        };
        assert!(err.to_string().contains("'CH1' has no stream 3"));
    }
}
