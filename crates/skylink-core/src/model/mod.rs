// ── Domain model ──
//
// Devices, their connectors, and the immutable state snapshots the
// rest of the SDK reasons about.

pub mod connector;
pub mod device;
pub mod uid;

pub use connector::{ConnectorKind, DeviceConnector, Technology};
pub use device::{
    ConnectionDelegate, ConnectionState, DeviceCore, DeviceKind, DeviceState,
};
pub use uid::DeviceUid;
