//! Waveform capture coordination.
//!
//! The [`CaptureCoordinator`] runs on its own thread and is the only producer of
//! waveform data; the render loop is the only consumer. The two never share a lock
//! over the buffers. They alternate through the ready/processed
//! [`WaveformHandshake`](crate::sync::WaveformHandshake), which only holds for exactly
//! one producer and one consumer.

pub mod coordinator;

pub use coordinator::{CaptureCoordinator, CaptureHandle, CaptureState, CaptureStats};
