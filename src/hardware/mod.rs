//! Hardware layer: the device transport seam, channel resolution, the mock
//! device, and the lifecycle guard.

pub mod channels;
pub mod guard;
pub mod mock;
pub mod transport;

pub use guard::DeviceGuard;
pub use transport::{
    ConnectionType, DeviceHandle, DeviceInfo, DeviceSelector, DeviceType, StreamTransport,
};
