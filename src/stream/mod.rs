//! Channels, stream descriptors and the displayed-stream registry.

pub mod channel;
pub mod descriptor;
pub mod registry;

pub use channel::{Channel, ChannelId, ChannelLease, StreamData, StreamKind, StreamSpec};
pub use descriptor::StreamDescriptor;
pub use registry::{MeasurementRow, RegistryAction, StreamRegistry};
