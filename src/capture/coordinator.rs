//! Background waveform capture loop.
//!
//! # State machine
//!
//! ```text
//!        ┌──────────────────────── not ready: sleep poll_interval ─────┐
//!        ▼                                                             │
//!  ┌──────────┐ shutdown? ┌──────────┐  ready  ┌─────────────┐        │
//!  │   Idle   ├──── no ──►│ Polling  ├────────►│ Downloading │        │
//!  └────┬─────┘           └────┬─────┘         └──────┬──────┘        │
//!       │ yes                  └──────────────────────┼───────────────┘
//!       ▼                                             │ signal "ready"
//!  ┌────────────┐                             ┌───────▼──────────┐
//!  │ Terminated │◄── (via Idle) ─── processed │ AwaitingConsumer │
//!  └────────────┘                             └──────────────────┘
//! ```
//!
//! The shutdown flag is sampled only on entry to `Idle`. A coordinator parked in
//! `AwaitingConsumer` therefore stays there until the consumer signals "processed",
//! even during teardown. [`CaptureHandle::shutdown`] provides that final signal.

use crate::config::CaptureConfig;
use crate::error::{AppResult, ScopeError};
use crate::session::InstrumentSession;
use crate::sync::{ShutdownFlag, ShutdownWatch, WaveformHandshake};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Phase of the capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CaptureState {
    /// Between cycles; the shutdown flag is checked here
    Idle = 0,
    /// Asking the session whether every instrument has data
    Polling = 1,
    /// Transferring data into the stream buffers
    Downloading = 2,
    /// "ready" signalled, waiting for "processed"
    AwaitingConsumer = 3,
    /// Loop exited
    Terminated = 4,
}

impl CaptureState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CaptureState::Idle,
            1 => CaptureState::Polling,
            2 => CaptureState::Downloading,
            3 => CaptureState::AwaitingConsumer,
            _ => CaptureState::Terminated,
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CaptureState::Idle => "idle",
            CaptureState::Polling => "polling",
            CaptureState::Downloading => "downloading",
            CaptureState::AwaitingConsumer => "awaiting_consumer",
            CaptureState::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// Counters for the capture loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Readiness polls issued
    pub polls: u64,
    /// Polls that found no data and slept before retrying
    pub retries: u64,
    /// Completed downloads
    pub downloads: u64,
    /// "ready" signals sent to the consumer
    pub handoffs: u64,
}

/// Live state shared between the capture thread and its handle.
#[derive(Debug)]
struct CaptureStatus {
    state: AtomicU8,
    polls: AtomicU64,
    retries: AtomicU64,
    downloads: AtomicU64,
    handoffs: AtomicU64,
}

impl CaptureStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(CaptureState::Idle as u8),
            polls: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            downloads: AtomicU64::new(0),
            handoffs: AtomicU64::new(0),
        }
    }

    fn enter(&self, state: CaptureState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn state(&self) -> CaptureState {
        CaptureState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            polls: self.polls.load(Ordering::SeqCst),
            retries: self.retries.load(Ordering::SeqCst),
            downloads: self.downloads.load(Ordering::SeqCst),
            handoffs: self.handoffs.load(Ordering::SeqCst),
        }
    }
}

/// Polls a session for completed acquisitions, downloads them and hands them to the
/// consumer through a [`WaveformHandshake`].
pub struct CaptureCoordinator<S> {
    session: Arc<S>,
    handshake: Arc<WaveformHandshake>,
    shutdown: ShutdownFlag,
    poll_interval: Duration,
    thread_name: String,
}

impl<S: InstrumentSession + 'static> CaptureCoordinator<S> {
    /// Coordinator over `session`, handing off through `handshake`.
    ///
    /// `shutdown` is the process-wide flag; the capture thread receives only a
    /// read-only watch of it.
    pub fn new(
        session: Arc<S>,
        handshake: Arc<WaveformHandshake>,
        shutdown: ShutdownFlag,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            session,
            handshake,
            shutdown,
            poll_interval: config.poll_interval(),
            thread_name: config.thread_name.clone(),
        }
    }

    /// Start the capture loop on its own named thread.
    pub fn spawn(self) -> AppResult<CaptureHandle> {
        let status = Arc::new(CaptureStatus::new());
        let worker = CaptureLoop {
            session: Arc::clone(&self.session),
            handshake: Arc::clone(&self.handshake),
            shutdown: self.shutdown.watch(),
            poll_interval: self.poll_interval,
            status: Arc::clone(&status),
        };

        let thread = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run())
            .map_err(ScopeError::ThreadSpawn)?;

        info!(
            thread = %self.thread_name,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Started capture thread"
        );

        Ok(CaptureHandle {
            shutdown: self.shutdown,
            handshake: self.handshake,
            status,
            thread: Some(thread),
        })
    }
}

struct CaptureLoop<S> {
    session: Arc<S>,
    handshake: Arc<WaveformHandshake>,
    shutdown: ShutdownWatch,
    poll_interval: Duration,
    status: Arc<CaptureStatus>,
}

impl<S: InstrumentSession> CaptureLoop<S> {
    fn run(self) {
        trace!("Starting");

        loop {
            self.status.enter(CaptureState::Idle);
            if self.shutdown.is_set() {
                break;
            }

            // Wait for data to be available from all instruments
            self.status.enter(CaptureState::Polling);
            self.status.polls.fetch_add(1, Ordering::SeqCst);
            if !self.session.check_for_pending_waveforms() {
                self.status.retries.fetch_add(1, Ordering::SeqCst);
                thread::sleep(self.poll_interval);
                continue;
            }

            self.status.enter(CaptureState::Downloading);
            trace!("Got a waveform");
            self.session.download_waveforms();
            self.status.downloads.fetch_add(1, Ordering::SeqCst);

            // Hand the buffers to the consumer and wait for them back
            self.status.enter(CaptureState::AwaitingConsumer);
            self.status.handoffs.fetch_add(1, Ordering::SeqCst);
            self.handshake.ready().signal();
            self.handshake.processed().block();
        }

        self.status.enter(CaptureState::Terminated);
        let stats = self.status.snapshot();
        debug!(
            polls = stats.polls,
            downloads = stats.downloads,
            "Shutting down"
        );
    }
}

/// Owner of a running capture thread.
///
/// Dropping a handle whose thread is still running performs [`shutdown`](Self::shutdown).
pub struct CaptureHandle {
    shutdown: ShutdownFlag,
    handshake: Arc<WaveformHandshake>,
    status: Arc<CaptureStatus>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Current loop phase.
    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.status.state()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> CaptureStats {
        self.status.snapshot()
    }

    /// The handshake shared with the capture thread.
    #[must_use]
    pub fn handshake(&self) -> &Arc<WaveformHandshake> {
        &self.handshake
    }

    /// Whether the capture thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Set the shutdown flag only.
    ///
    /// A thread parked in `AwaitingConsumer` keeps waiting until the consumer signals
    /// "processed".
    pub fn request_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait for the capture thread to exit, without requesting it.
    pub fn join(mut self) -> AppResult<CaptureStats> {
        self.join_thread()
    }

    /// Set the shutdown flag, release a thread waiting on the consumer and join it.
    pub fn shutdown(mut self) -> AppResult<CaptureStats> {
        self.stop()
    }

    fn stop(&mut self) -> AppResult<CaptureStats> {
        self.shutdown.trigger();
        // The loop checks the flag only at the top of a cycle, so a thread parked in
        // AwaitingConsumer needs one last "processed" to get there.
        self.handshake.release_producer();
        self.join_thread()
    }

    fn join_thread(&mut self) -> AppResult<CaptureStats> {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Capture thread panicked");
                return Err(ScopeError::CaptureThreadPanicked);
            }
            let stats = self.status.snapshot();
            info!(
                downloads = stats.downloads,
                retries = stats.retries,
                "Capture thread stopped"
            );
        }
        Ok(self.status.snapshot())
    }
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(e) = self.stop() {
                error!("Error stopping capture thread on drop: {}", e);
            }
        }
    }
}
