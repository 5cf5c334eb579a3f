//! Stream descriptors: one output of one channel.

use super::channel::{Channel, ChannelId, StreamSpec};
use crate::error::{AppResult, ScopeError};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identifies one output (by index) of one channel.
///
/// Equality and hashing are structural over (channel identity, stream index).
/// Cloning is cheap. A descriptor keeps the channel object alive but holds no counted
/// reference on it; counted ownership belongs to whichever registry tracks the
/// descriptor.
#[derive(Clone)]
pub struct StreamDescriptor {
    channel: Arc<Channel>,
    stream: usize,
}

impl StreamDescriptor {
    /// Descriptor for output `stream` of `channel`.
    pub fn new(channel: &Arc<Channel>, stream: usize) -> AppResult<Self> {
        if stream >= channel.stream_count() {
            return Err(ScopeError::InvalidStream {
                channel: channel.name().to_string(),
                stream,
                count: channel.stream_count(),
            });
        }
        Ok(Self {
            channel: Arc::clone(channel),
            stream,
        })
    }

    /// Descriptors for every output of `channel`, in stream order.
    pub fn all(channel: &Arc<Channel>) -> impl Iterator<Item = StreamDescriptor> + '_ {
        (0..channel.stream_count()).map(move |stream| Self {
            channel: Arc::clone(channel),
            stream,
        })
    }

    /// The channel this stream belongs to.
    #[must_use]
    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    /// Output index within the channel.
    #[must_use]
    pub fn stream(&self) -> usize {
        self.stream
    }

    /// Identity of the owning channel.
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.channel.id()
    }

    /// Static description of the output.
    #[must_use]
    pub fn spec(&self) -> Option<&StreamSpec> {
        self.channel.stream_spec(self.stream)
    }

    /// Display name: the channel name, qualified by the stream name when the channel
    /// has more than one output.
    #[must_use]
    pub fn name(&self) -> String {
        match self.spec() {
            Some(spec) if self.channel.stream_count() > 1 => {
                format!("{}.{}", self.channel.name(), spec.name)
            }
            _ => self.channel.name().to_string(),
        }
    }

    /// Latest scalar value written to this stream, if any.
    #[must_use]
    pub fn scalar_value(&self) -> Option<f64> {
        self.channel
            .read_stream(self.stream)
            .and_then(|data| data.scalar)
    }

    fn key(&self) -> (ChannelId, usize) {
        (self.channel.id(), self.stream)
    }
}

impl PartialEq for StreamDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for StreamDescriptor {}

impl Hash for StreamDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDescriptor")
            .field("channel", &self.channel.id())
            .field("name", &self.name())
            .field("stream", &self.stream)
            .finish()
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
