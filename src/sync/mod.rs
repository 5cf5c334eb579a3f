//! Cross-thread coordination primitives for the capture path.

pub mod handshake;
pub mod shutdown;
pub mod waveform;

pub use handshake::Handshake;
pub use shutdown::{ShutdownFlag, ShutdownWatch};
pub use waveform::{ReadWindow, WaveformHandshake};
