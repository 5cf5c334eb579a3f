//! Instrument session interface consumed by the capture coordinator.
//!
//! A session groups every attached instrument. The coordinator needs exactly two
//! things from it: a cheap readiness poll and a blocking download. Everything else
//! (transport, protocol, trigger setup) stays behind this trait.
//!
//! [`MockSession`] simulates a bench of oscilloscopes for tests and the CLI.

pub mod mock;

pub use mock::{MockScope, MockSession};

/// Access to the attached instruments.
///
/// Implementations are called from the capture thread only, but are shared with
/// the UI (for trigger control) and therefore must be `Send + Sync`.
pub trait InstrumentSession: Send + Sync {
    /// Non-blocking: `true` iff every attached instrument has a completed
    /// acquisition awaiting transfer.
    fn check_for_pending_waveforms(&self) -> bool;

    /// Blocking: transfer all pending acquisitions into the channel stream buffers.
    ///
    /// Duration is unbounded and depends on instrument and transport speed.
    fn download_waveforms(&self);
}

/// Trigger arming state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    /// Re-arm after every acquisition
    #[default]
    Normal,
    /// Capture one acquisition, then stop
    Single,
    /// Not armed; no acquisitions complete
    Stopped,
}
