//! Simulated oscilloscope bench.
//!
//! Each [`MockScope`] "triggers" once per configured period. The session reports data
//! ready when every scope has triggered since the last download, and a download fills
//! each channel with a noisy sine (analog), a square wave (digital) and the peak-to-peak
//! amplitude of the channel's first analog stream (scalar).

use super::{InstrumentSession, TriggerMode};
use crate::stream::{Channel, StreamKind, StreamSpec};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_SAMPLES: usize = 1000;

/// One simulated instrument.
#[derive(Debug)]
pub struct MockScope {
    name: String,
    channels: Vec<Arc<Channel>>,
    trigger_period: Duration,
    last_trigger: Mutex<Instant>,
}

impl MockScope {
    /// A scope with the given channels, triggering every `trigger_period`.
    pub fn new(
        name: impl Into<String>,
        channels: Vec<Arc<Channel>>,
        trigger_period: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            channels,
            trigger_period,
            last_trigger: Mutex::new(Instant::now()),
        }
    }

    /// A scope with `count` channels named `<name>:CH1..`, each exposing a waveform and
    /// a peak-to-peak measurement.
    pub fn with_analog_channels(
        name: impl Into<String>,
        count: usize,
        trigger_period: Duration,
    ) -> Self {
        let name = name.into();
        let channels = (1..=count)
            .map(|i| {
                Channel::instrument(
                    format!("{name}:CH{i}"),
                    [StreamSpec::analog("data"), StreamSpec::scalar("Vpp")],
                )
            })
            .collect();
        Self::new(name, channels, trigger_period)
    }

    /// Scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channels of this scope.
    #[must_use]
    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    fn has_triggered(&self) -> bool {
        self.last_trigger.lock().elapsed() >= self.trigger_period
    }
}

#[derive(Debug)]
struct MockState {
    mode: TriggerMode,
    sequence: u64,
    rng: StdRng,
}

/// A session made of simulated scopes.
#[derive(Debug)]
pub struct MockSession {
    scopes: Vec<MockScope>,
    samples_per_capture: usize,
    state: Mutex<MockState>,
    polls: AtomicU64,
}

impl MockSession {
    /// Session over `scopes`, in normal trigger mode.
    pub fn new(scopes: Vec<MockScope>) -> Self {
        Self::with_seed(scopes, rand::random())
    }

    /// Session with a fixed noise seed, for reproducible data.
    pub fn with_seed(scopes: Vec<MockScope>, seed: u64) -> Self {
        info!(scopes = scopes.len(), "Created mock session");
        Self {
            scopes,
            samples_per_capture: DEFAULT_SAMPLES,
            state: Mutex::new(MockState {
                mode: TriggerMode::Normal,
                sequence: 0,
                rng: StdRng::seed_from_u64(seed),
            }),
            polls: AtomicU64::new(0),
        }
    }

    /// Samples generated per analog stream per download.
    #[must_use]
    pub fn samples_per_capture(mut self, samples: usize) -> Self {
        self.samples_per_capture = samples;
        self
    }

    /// Attached scopes.
    #[must_use]
    pub fn scopes(&self) -> &[MockScope] {
        &self.scopes
    }

    /// Every channel of every scope.
    pub fn channels(&self) -> impl Iterator<Item = &Arc<Channel>> {
        self.scopes.iter().flat_map(|s| s.channels.iter())
    }

    /// Arm the trigger (start, single) or disarm it (stop).
    pub fn arm(&self, mode: TriggerMode) {
        debug!(?mode, "Trigger mode changed");
        self.state.lock().mode = mode;
    }

    /// Current trigger mode.
    #[must_use]
    pub fn trigger_mode(&self) -> TriggerMode {
        self.state.lock().mode
    }

    /// Completed downloads.
    #[must_use]
    pub fn downloads(&self) -> u64 {
        self.state.lock().sequence
    }

    /// Readiness polls received.
    #[must_use]
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    fn fill_channel(&self, channel: &Channel, index: usize, sequence: u64, rng: &mut StdRng) {
        let n = self.samples_per_capture;
        // Stagger frequencies so channels are distinguishable on screen
        let cycles = 2.0 + index as f32;
        let amplitude = 1.0 + 0.1 * index as f32;
        let phase = sequence as f32 * 0.1;
        let mut peak_to_peak = None;

        for stream in 0..channel.stream_count() {
            let Some(spec) = channel.stream_spec(stream) else {
                continue;
            };
            match spec.kind {
                StreamKind::Analog => {
                    let samples: Vec<f32> = (0..n)
                        .map(|i| {
                            let t = i as f32 / n as f32;
                            amplitude * (TAU * cycles * t + phase).sin()
                                + rng.gen_range(-0.02..0.02)
                        })
                        .collect();
                    if peak_to_peak.is_none() {
                        peak_to_peak = Some(vpp(&samples));
                    }
                    channel.write_stream(stream, samples, None, sequence);
                }
                StreamKind::Digital => {
                    let samples = (0..n)
                        .map(|i| if (i * 2 * cycles as usize / n) % 2 == 0 { 0.0 } else { 1.0 })
                        .collect();
                    channel.write_stream(stream, samples, None, sequence);
                }
                StreamKind::Scalar => {
                    let value = peak_to_peak.unwrap_or_else(|| rng.gen_range(0.0..1.0));
                    channel.write_stream(stream, Vec::new(), Some(value), sequence);
                }
            }
        }
    }
}

fn vpp(samples: &[f32]) -> f64 {
    let (min, max) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });
    if samples.is_empty() {
        0.0
    } else {
        f64::from(max - min)
    }
}

impl InstrumentSession for MockSession {
    fn check_for_pending_waveforms(&self) -> bool {
        self.polls.fetch_add(1, Ordering::Relaxed);
        if self.state.lock().mode == TriggerMode::Stopped {
            return false;
        }
        self.scopes.iter().all(MockScope::has_triggered)
    }

    fn download_waveforms(&self) {
        let mut state = self.state.lock();
        state.sequence += 1;
        let sequence = state.sequence;

        for scope in &self.scopes {
            for (index, channel) in scope.channels.iter().enumerate() {
                self.fill_channel(channel, index, sequence, &mut state.rng);
            }
            *scope.last_trigger.lock() = Instant::now();
        }

        if state.mode == TriggerMode::Single {
            state.mode = TriggerMode::Stopped;
            debug!("Single-shot capture complete, trigger stopped");
        }
        debug!(sequence, "Downloaded waveforms");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_bench() -> MockSession {
        MockSession::with_seed(
            vec![
                MockScope::with_analog_channels("scope1", 2, Duration::ZERO),
                MockScope::with_analog_channels("scope2", 1, Duration::ZERO),
            ],
            7,
        )
        .samples_per_capture(100)
    }

    #[test]
    fn test_ready_requires_all_scopes() {
        let session = MockSession::with_seed(
            vec![
                MockScope::with_analog_channels("fast", 1, Duration::ZERO),
                MockScope::with_analog_channels("slow", 1, Duration::from_secs(3600)),
            ],
            1,
        );
        assert!(!session.check_for_pending_waveforms());
        assert_eq!(session.polls(), 1);
    }

    #[test]
    fn test_download_fills_streams() {
        let session = instant_bench();
        assert!(session.check_for_pending_waveforms());
        session.download_waveforms();

        assert_eq!(session.downloads(), 1);
        for channel in session.channels() {
            let data = channel.read_stream(0).unwrap();
            assert_eq!(data.samples.len(), 100);
            assert_eq!(data.sequence, 1);

            let vpp = channel.read_stream(1).unwrap().scalar.unwrap();
            assert!(vpp > 1.5 && vpp < 3.0, "unexpected Vpp {vpp}");
        }
        assert_eq!(session.channels().count(), 3);
    }

    #[test]
    fn test_stopped_session_never_ready() {
        let session = instant_bench();
        session.arm(TriggerMode::Stopped);
        assert!(!session.check_for_pending_waveforms());
    }

    #[test]
    fn test_single_shot_disarms() {
        let session = instant_bench();
        session.arm(TriggerMode::Single);
        assert!(session.check_for_pending_waveforms());
        session.download_waveforms();

        assert_eq!(session.trigger_mode(), TriggerMode::Stopped);
        assert!(!session.check_for_pending_waveforms());
    }

    #[test]
    fn test_vpp() {
        assert_eq!(vpp(&[]), 0.0);
        assert!((vpp(&[-1.0, 0.5, 1.0]) - 2.0).abs() < 1e-9);
    }
}
