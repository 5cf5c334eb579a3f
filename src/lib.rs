//! # Scope DAQ Core Library
//!
//! This crate holds the parts of an oscilloscope front-end that need precise
//! concurrency and lifecycle rules. Windows, dialogs and instrument protocols live
//! elsewhere and reach this crate through narrow interfaces.
//!
//! ## Crate Structure
//!
//! - **`capture`**: The `CaptureCoordinator`, a background thread that polls the
//!   instrument session for completed acquisitions, downloads them and hands them to
//!   the render loop.
//! - **`sync`**: The binary `Handshake` signal, the ready/processed
//!   `WaveformHandshake` pair with its `ReadWindow` guard, and the `ShutdownFlag`.
//! - **`stream`**: `Channel`s and their stream buffers, `StreamDescriptor`s, and the
//!   `StreamRegistry` tracking which streams a measurement table displays, with
//!   reference-counted channel ownership.
//! - **`session`**: The `InstrumentSession` trait the coordinator drives, plus a
//!   simulated `MockSession`.
//! - **`config`**: Layered configuration loading with `figment`.
//! - **`tracing_setup`**: `tracing-subscriber` initialisation.
//! - **`error`**: The crate-wide `ScopeError` enum.
//!
//! ## Threading model
//!
//! Exactly one producer (the capture thread) and one consumer (the render loop)
//! share the stream buffers, alternating through the handshake. The registry is
//! touched only from the render/UI thread.
//!
//! ```no_run
//! use scope_daq::capture::CaptureCoordinator;
//! use scope_daq::config::CaptureConfig;
//! use scope_daq::session::{MockScope, MockSession};
//! use scope_daq::stream::{StreamDescriptor, StreamRegistry};
//! use scope_daq::sync::{ShutdownFlag, WaveformHandshake};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(MockSession::new(vec![MockScope::with_analog_channels(
//!     "scope1",
//!     2,
//!     Duration::from_millis(20),
//! )]));
//!
//! let mut registry = StreamRegistry::new();
//! for channel in session.channels() {
//!     registry.add(StreamDescriptor::new(channel, 1)?);
//! }
//!
//! let handshake = Arc::new(WaveformHandshake::new());
//! let capture = CaptureCoordinator::new(
//!     Arc::clone(&session),
//!     Arc::clone(&handshake),
//!     ShutdownFlag::new(),
//!     &CaptureConfig::default(),
//! )
//! .spawn()?;
//!
//! let window = handshake.wait_ready();
//! for row in registry.rows() {
//!     println!("{row}");
//! }
//! window.finish();
//!
//! capture.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod sync;
pub mod tracing_setup;

pub use error::{AppResult, ScopeError};
