//! Measurement channels, their streams, and counted channel ownership.
//!
//! A [`Channel`] is a source of measurement data with one or more output streams
//! (an analog waveform, a scalar measurement, ...). Every stream carries a data
//! buffer that the instrument session writes during download and the render side
//! reads inside a [`ReadWindow`](crate::sync::ReadWindow).
//!
//! # Ownership
//!
//! Channels come in two variants, fixed at construction:
//!
//! - Counted ([`Channel::instrument`]): hardware channels. Displays that show one of their
//!   streams hold a [`ChannelLease`]; the channel may only be torn down once
//!   [`Channel::ref_count`] is back to zero.
//! - Uncounted ([`Channel::derived`]): derived channels (filter or math outputs) whose
//!   lifetime is owned elsewhere. Leasing one yields nothing.
//!
//! Leases are minted only inside this crate (by the stream registry) and released
//! only by dropping them, so every release is paired with exactly one prior acquire.

use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique channel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch#{}", self.0)
    }
}

/// What kind of data a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Sampled waveform
    Analog,
    /// Digital waveform
    Digital,
    /// Single value per capture
    Scalar,
}

/// Static description of one channel output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    /// Output name, e.g. "data" or "Vpp"
    pub name: String,
    /// Data kind
    pub kind: StreamKind,
}

impl StreamSpec {
    /// Analog waveform output.
    pub fn analog(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StreamKind::Analog,
        }
    }

    /// Digital waveform output.
    pub fn digital(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StreamKind::Digital,
        }
    }

    /// Scalar measurement output.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StreamKind::Scalar,
        }
    }
}

/// Contents of one stream's buffer after the most recent download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamData {
    /// Waveform samples (empty for scalar streams)
    pub samples: Vec<f32>,
    /// Latest scalar value, if the stream produces one
    pub scalar: Option<f64>,
    /// Download sequence number that produced this data (0 = never written)
    pub sequence: u64,
}

#[derive(Debug)]
struct Stream {
    spec: StreamSpec,
    // Only contended if a caller ignores the ready/processed protocol.
    data: RwLock<StreamData>,
}

/// Reference-counting capability of a channel.
#[derive(Debug)]
enum Ownership {
    /// Lifetime tracked by outstanding leases.
    Counted(AtomicUsize),
    /// Lifetime managed outside of any display.
    Uncounted,
}

/// A source of measurement data with one or more output streams.
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    name: String,
    streams: Vec<Stream>,
    ownership: Ownership,
}

impl Channel {
    /// A hardware channel whose lifetime is reference counted.
    pub fn instrument(
        name: impl Into<String>,
        streams: impl IntoIterator<Item = StreamSpec>,
    ) -> Arc<Self> {
        Self::build(name.into(), streams, Ownership::Counted(AtomicUsize::new(0)))
    }

    /// A derived channel (filter output, math result) that is not reference counted.
    pub fn derived(
        name: impl Into<String>,
        streams: impl IntoIterator<Item = StreamSpec>,
    ) -> Arc<Self> {
        Self::build(name.into(), streams, Ownership::Uncounted)
    }

    fn build(
        name: String,
        streams: impl IntoIterator<Item = StreamSpec>,
        ownership: Ownership,
    ) -> Arc<Self> {
        let streams = streams
            .into_iter()
            .map(|spec| Stream {
                spec,
                data: RwLock::new(StreamData::default()),
            })
            .collect();

        Arc::new(Self {
            id: ChannelId::next(),
            name,
            streams,
            ownership,
        })
    }

    /// Channel identity.
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of output streams.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Description of stream `index`.
    #[must_use]
    pub fn stream_spec(&self, index: usize) -> Option<&StreamSpec> {
        self.streams.get(index).map(|s| &s.spec)
    }

    /// Whether this channel participates in reference counting.
    #[must_use]
    pub fn is_counted(&self) -> bool {
        matches!(self.ownership, Ownership::Counted(_))
    }

    /// Outstanding leases, or `None` for uncounted channels.
    #[must_use]
    pub fn ref_count(&self) -> Option<usize> {
        match &self.ownership {
            Ownership::Counted(count) => Some(count.load(Ordering::Acquire)),
            Ownership::Uncounted => None,
        }
    }

    /// Whether no display holds this channel; always true for uncounted channels.
    #[must_use]
    pub fn is_unreferenced(&self) -> bool {
        self.ref_count().unwrap_or(0) == 0
    }

    /// Replace the contents of stream `index`. Returns `false` if there is no such stream.
    ///
    /// Called by the instrument session while downloading.
    pub fn write_stream(
        &self,
        index: usize,
        samples: Vec<f32>,
        scalar: Option<f64>,
        sequence: u64,
    ) -> bool {
        let Some(stream) = self.streams.get(index) else {
            return false;
        };
        *stream.data.write() = StreamData {
            samples,
            scalar,
            sequence,
        };
        true
    }

    /// Read access to the buffer of stream `index`.
    #[must_use]
    pub fn read_stream(&self, index: usize) -> Option<RwLockReadGuard<'_, StreamData>> {
        self.streams.get(index).map(|s| s.data.read())
    }

    /// Take one counted reference. `None` for uncounted channels.
    pub(crate) fn lease(self: &Arc<Self>) -> Option<ChannelLease> {
        let Ownership::Counted(count) = &self.ownership else {
            return None;
        };
        let refs = count.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(channel = %self.name, refs, "Channel reference acquired");
        Some(ChannelLease {
            channel: Arc::clone(self),
        })
    }

    fn release(&self) {
        if let Ownership::Counted(count) = &self.ownership {
            let previous = count.fetch_sub(1, Ordering::AcqRel);
            // Leases are the only release path, one per acquire.
            debug_assert!(previous > 0, "channel reference count underflow");
            trace!(
                channel = %self.name,
                refs = previous.saturating_sub(1),
                "Channel reference released"
            );
        }
    }
}

/// One counted reference on an instrument channel, released on drop.
///
/// Not `Clone`: duplicating a lease would let a single acquire be released twice.
#[derive(Debug)]
pub struct ChannelLease {
    channel: Arc<Channel>,
}

impl ChannelLease {
    /// The leased channel.
    #[must_use]
    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }
}

impl Drop for ChannelLease {
    fn drop(&mut self) {
        self.channel.release();
    }
}
