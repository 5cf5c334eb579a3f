//! Ordered, deduplicated registry of displayed streams.
//!
//! The registry backs a measurement table: rows are shown in registry order, the user
//! adds rows by dragging a stream in, deletes them from a context menu and reorders
//! them by dragging one row onto another.
//!
//! Each tracked stream owns one [`ChannelLease`] on its channel (for counted channels),
//! taken when the stream is added and released when it is removed or the registry is
//! dropped. Reordering moves the lease along with the row and never touches the count.
//!
//! # Threading
//!
//! `StreamRegistry` has no internal locking. It is driven from the UI thread only; the
//! capture thread never sees it. `&mut self` on every mutation makes concurrent
//! mutation a compile error rather than a runtime hazard.

use super::channel::ChannelLease;
use super::descriptor::StreamDescriptor;
use crate::error::{AppResult, ScopeError};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, trace};

/// A discrete edit delivered by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryAction {
    /// Stream dropped onto the table (including onto the empty placeholder row)
    Add(StreamDescriptor),
    /// "Delete" chosen on the row at this position
    Remove(usize),
    /// Stream dragged onto the row at `dest`
    Move {
        /// Dragged stream, tracked or not
        stream: StreamDescriptor,
        /// Row it was dropped on
        dest: usize,
    },
}

/// One rendered row of the measurement table.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    /// Stream display name
    pub name: String,
    /// Latest scalar value, if the stream has produced one
    pub value: Option<f64>,
}

impl fmt::Display for MeasurementRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}: {:.6}", self.name, value),
            None => write!(f, "{}: --", self.name),
        }
    }
}

#[derive(Debug)]
struct TrackedStream {
    descriptor: StreamDescriptor,
    // Held for its Drop; `None` for uncounted channels.
    lease: Option<ChannelLease>,
}

impl TrackedStream {
    fn track(descriptor: StreamDescriptor) -> Self {
        let lease = descriptor.channel().lease();
        Self { descriptor, lease }
    }
}

/// Ordered set of displayed streams with counted channel ownership.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    /// Display order
    entries: Vec<TrackedStream>,
    /// Membership index over the same descriptors
    members: HashSet<StreamDescriptor>,
}

impl StreamRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `stream` unless an equal descriptor is already tracked.
    ///
    /// Returns `true` if the stream was added (and one channel reference taken).
    pub fn add(&mut self, stream: StreamDescriptor) -> bool {
        if self.members.contains(&stream) {
            trace!(stream = %stream, "Stream already tracked, ignoring add");
            return false;
        }

        debug!(stream = %stream, position = self.entries.len(), "Adding stream");
        self.members.insert(stream.clone());
        self.entries.push(TrackedStream::track(stream));
        self.debug_check();
        true
    }

    /// Remove the row at `position`, releasing its channel reference.
    ///
    /// Returns the removed descriptor. Fails without modifying the registry if
    /// `position` is out of range.
    pub fn remove(&mut self, position: usize) -> AppResult<StreamDescriptor> {
        if position >= self.entries.len() {
            return Err(ScopeError::PositionOutOfRange {
                position,
                len: self.entries.len(),
            });
        }

        let TrackedStream { descriptor, lease } = self.entries.remove(position);
        self.members.remove(&descriptor);
        drop(lease);
        debug!(stream = %descriptor, position, "Removed stream");
        self.debug_check();
        Ok(descriptor)
    }

    /// Reposition `stream` to `dest` (clamped to the valid range).
    ///
    /// A tracked stream is moved without any change to channel reference counts. An
    /// untracked stream (dragged in from elsewhere) is added first and then placed.
    /// Returns the final position.
    pub fn move_stream(&mut self, stream: StreamDescriptor, dest: usize) -> usize {
        let entry = match self.position(&stream) {
            Some(current) => {
                trace!(stream = %stream, from = current, to = dest, "Moving stream");
                self.entries.remove(current)
            }
            None => {
                debug!(stream = %stream, to = dest, "Adding dragged-in stream");
                self.members.insert(stream.clone());
                TrackedStream::track(stream)
            }
        };

        let dest = dest.min(self.entries.len());
        self.entries.insert(dest, entry);
        self.debug_check();
        dest
    }

    /// Apply one UI edit.
    pub fn apply(&mut self, action: RegistryAction) -> AppResult<()> {
        match action {
            RegistryAction::Add(stream) => {
                self.add(stream);
            }
            RegistryAction::Remove(position) => {
                self.remove(position)?;
            }
            RegistryAction::Move { stream, dest } => {
                self.move_stream(stream, dest);
            }
        }
        Ok(())
    }

    /// Whether an equal descriptor is tracked.
    #[must_use]
    pub fn contains(&self, stream: &StreamDescriptor) -> bool {
        self.members.contains(stream)
    }

    /// Current row of `stream`, if tracked.
    #[must_use]
    pub fn position(&self, stream: &StreamDescriptor) -> Option<usize> {
        if !self.contains(stream) {
            return None;
        }
        self.entries.iter().position(|e| &e.descriptor == stream)
    }

    /// Number of tracked streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stream at row `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StreamDescriptor> {
        self.entries.get(index).map(|e| &e.descriptor)
    }

    /// Streams in display order.
    pub fn iter(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Measurement table rows in display order.
    ///
    /// Reads stream buffers, so call it inside a read window.
    #[must_use]
    pub fn rows(&self) -> Vec<MeasurementRow> {
        self.iter()
            .map(|stream| MeasurementRow {
                name: stream.name(),
                value: stream.scalar_value(),
            })
            .collect()
    }

    /// Drop every tracked stream, releasing each held reference once.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!(count = self.entries.len(), "Releasing all tracked streams");
        }
        self.members.clear();
        self.entries.clear();
    }

    fn debug_check(&self) {
        debug_assert_eq!(
            self.entries.len(),
            self.members.len(),
            "stream order and membership index diverged"
        );
    }
}

impl Drop for StreamRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::channel::{Channel, StreamSpec};
    use std::sync::Arc;

    fn scope_channel(name: &str) -> Arc<Channel> {
        Channel::instrument(name, [StreamSpec::analog("data")])
    }

    fn stream(channel: &Arc<Channel>) -> StreamDescriptor {
        StreamDescriptor::new(channel, 0).unwrap()
    }

    fn assert_index_matches_order(registry: &StreamRegistry) {
        let ordered: HashSet<_> = registry.iter().cloned().collect();
        assert_eq!(ordered.len(), registry.len(), "duplicate in display order");
        assert_eq!(ordered, registry.members);
    }

    #[test]
    fn test_add_then_contains() {
        let ch = scope_channel("CH1");
        let mut registry = StreamRegistry::new();

        assert!(registry.add(stream(&ch)));
        assert!(registry.contains(&stream(&ch)));
        assert_eq!(ch.ref_count(), Some(1));
        assert_index_matches_order(&registry);
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let ch = scope_channel("CH1");
        let mut registry = StreamRegistry::new();

        assert!(registry.add(stream(&ch)));
        assert!(!registry.add(stream(&ch)));
        assert_eq!(registry.len(), 1);
        assert_eq!(ch.ref_count(), Some(1));
    }

    #[test]
    fn test_remove_releases_reference() {
        let ch = scope_channel("CH1");
        let mut registry = StreamRegistry::new();
        registry.add(stream(&ch));

        let removed = registry.remove(0).unwrap();
        assert_eq!(removed, stream(&ch));
        assert!(registry.is_empty());
        assert!(!registry.contains(&removed));
        assert_eq!(ch.ref_count(), Some(0));
        assert_index_matches_order(&registry);
    }

    #[test]
    fn test_move_untracked_adds() {
        let a = scope_channel("A");
        let b = scope_channel("B");
        let mut registry = StreamRegistry::new();
        registry.add(stream(&a));

        let at = registry.move_stream(stream(&b), 0);
        assert_eq!(at, 0);
        assert_eq!(registry.get(0), Some(&stream(&b)));
        assert_eq!(b.ref_count(), Some(1));
        assert_index_matches_order(&registry);
    }

    #[test]
    fn test_move_clamps_destination() {
        let a = scope_channel("A");
        let b = scope_channel("B");
        let mut registry = StreamRegistry::new();
        registry.add(stream(&a));
        registry.add(stream(&b));

        assert_eq!(registry.move_stream(stream(&a), 99), 1);
        let order: Vec<_> = registry.iter().map(|d| d.name()).collect();
        assert_eq!(order, vec!["B", "A"]);
    }

    #[test]
    fn test_apply_actions() {
        let a = scope_channel("A");
        let b = scope_channel("B");
        let mut registry = StreamRegistry::new();

        registry.apply(RegistryAction::Add(stream(&a))).unwrap();
        registry.apply(RegistryAction::Add(stream(&b))).unwrap();
        registry
            .apply(RegistryAction::Move {
                stream: stream(&b),
                dest: 0,
            })
            .unwrap();
        registry.apply(RegistryAction::Remove(1)).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0), Some(&stream(&b)));
        assert_eq!(a.ref_count(), Some(0));
        assert!(registry.apply(RegistryAction::Remove(5)).is_err());
    }

    #[test]
    fn test_derived_streams_tracked_without_counting() {
        let filter = Channel::derived("FFT", [StreamSpec::analog("magnitude")]);
        let mut registry = StreamRegistry::new();

        assert!(registry.add(stream(&filter)));
        assert_eq!(filter.ref_count(), None);
        registry.remove(0).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rows_follow_display_order() {
        let a = Channel::instrument("A", [StreamSpec::scalar("Vpp")]);
        let b = scope_channel("B");
        a.write_stream(0, Vec::new(), Some(0.25), 1);

        let mut registry = StreamRegistry::new();
        registry.add(stream(&b));
        registry.add(stream(&a));

        let rows = registry.rows();
        assert_eq!(rows[0].name, "B");
        assert_eq!(rows[0].value, None);
        assert_eq!(rows[1].value, Some(0.25));
        assert_eq!(rows[1].to_string(), "A: 0.250000");
        assert_eq!(rows[0].to_string(), "B: --");
    }

    #[test]
    fn test_drop_releases_everything() {
        let ch = Channel::instrument(
            "CH1",
            [StreamSpec::analog("data"), StreamSpec::scalar("Vpp")],
        );
        {
            let mut registry = StreamRegistry::new();
            for d in StreamDescriptor::all(&ch) {
                registry.add(d);
            }
            assert_eq!(ch.ref_count(), Some(2));
        }
        assert_eq!(ch.ref_count(), Some(0));
    }
}
