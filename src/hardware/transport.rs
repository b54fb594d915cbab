//! Device transport seam.
//!
//! The acquisition core never talks to vendor libraries directly. Everything
//! the session needs from the hardware is expressed by the [`StreamTransport`]
//! trait: open a device matching a selector, upload a periodic stream-out
//! table, start a synchronized input+output stream, read interleaved blocks,
//! stop and close. A transport also provides the monotonic host tick the
//! session uses to bound the run by wall time.
//!
//! # Contract
//!
//! - All fallible operations return [`TransportError`] carrying the vendor
//!   numeric code and message; the session maps these into the crate taxonomy
//!   without losing either.
//! - [`DeviceHandle`] is an opaque token for exactly one open device. Every
//!   operation on a closed (or never-opened) handle fails.
//! - `read_stream` blocks the caller until `scans_per_read` scans are
//!   buffered or the device reports an error. Returned blocks are interleaved
//!   in scan-list order: `(scan0·chan0, scan0·chan1, …, scan1·chan0, …)`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::stream::waveform::OutputWaveform;

/// Device model selector for [`StreamTransport::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    /// Match any supported device model.
    #[default]
    Any,
    T4,
    T7,
    T8,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceType::Any => "ANY",
            DeviceType::T4 => "T4",
            DeviceType::T7 => "T7",
            DeviceType::T8 => "T8",
        };
        f.write_str(name)
    }
}

/// Connection medium selector for [`StreamTransport::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionType {
    /// Match any connection medium.
    #[default]
    Any,
    Usb,
    Ethernet,
    Wifi,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionType::Any => "ANY",
            ConnectionType::Usb => "USB",
            ConnectionType::Ethernet => "ETHERNET",
            ConnectionType::Wifi => "WIFI",
        };
        f.write_str(name)
    }
}

/// The (device type, connection type, identifier) triple used to pick a
/// physical device. `identifier` is a serial number, IP address, or `"ANY"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    pub device_type: DeviceType,
    pub connection_type: ConnectionType,
    pub identifier: String,
}

impl DeviceSelector {
    /// Selector matching the first device found on any interface.
    pub fn any() -> Self {
        Self {
            device_type: DeviceType::Any,
            connection_type: ConnectionType::Any,
            identifier: "ANY".to_string(),
        }
    }
}

/// Opaque token for one open device connection.
///
/// Valid only between a successful [`StreamTransport::open`] and the matching
/// [`StreamTransport::close`]; the transport rejects operations on anything
/// else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub(crate) i32);

impl DeviceHandle {
    /// Raw handle value, for log output only.
    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an opened device, logged once after open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub connection_type: ConnectionType,
    pub serial_number: u32,
}

/// Hardware interface for synchronized stream acquisition.
///
/// Implementations must be `Send + Sync`; the session holds the transport
/// behind an `Arc` and drives it from a single logical task, so no internal
/// ordering guarantees beyond per-call atomicity are required.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a device matching the selector.
    async fn open(&self, selector: &DeviceSelector) -> Result<DeviceHandle, TransportError>;

    /// Identity of an opened device.
    async fn device_info(&self, handle: DeviceHandle) -> Result<DeviceInfo, TransportError>;

    /// Upload the waveform table as the device's periodic stream-out buffer
    /// for the waveform's slot, replayed at `scan_rate` against the shared
    /// acquisition clock.
    async fn configure_output_stream(
        &self,
        handle: DeviceHandle,
        waveform: &OutputWaveform,
        scan_rate: f64,
    ) -> Result<(), TransportError>;

    /// Start streaming the given channel list at `requested_rate` scans per
    /// second. Returns the *actual* rate the device clock achieved, which may
    /// differ from the request due to clock granularity.
    async fn start_stream(
        &self,
        handle: DeviceHandle,
        scans_per_read: usize,
        channels: &[u32],
        requested_rate: f64,
    ) -> Result<f64, TransportError>;

    /// Read exactly one block of `scans_per_read` scans across all streamed
    /// channels, blocking until the device has buffered that many.
    async fn read_stream(&self, handle: DeviceHandle) -> Result<Vec<f64>, TransportError>;

    /// Stop an active stream. Fails if no stream is running.
    async fn stop_stream(&self, handle: DeviceHandle) -> Result<(), TransportError>;

    /// Close the device connection, invalidating the handle.
    async fn close(&self, handle: DeviceHandle) -> Result<(), TransportError>;

    /// Monotonic host-side tick in microseconds, independent of device data
    /// arrival. The session's run-duration deadline is measured on this
    /// clock.
    fn monotonic_tick(&self) -> u64;
}
