//! Custom error types for the application.
//!
//! This module defines the primary error type, `StreamError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures an acquisition
//! session can hit, from invalid static parameters to errors reported by the
//! device transport mid-stream.
//!
//! ## Error taxonomy
//!
//! - **`Configuration`**: semantic errors in static parameters (empty channel
//!   list, stream-out slot out of range, bad sample count). Raised before any
//!   device interaction.
//! - **`UnknownChannel`**: a symbolic channel name that the register map does
//!   not recognize.
//! - **`DeviceOpen`**: no device matched the open selectors. Carries the
//!   selector values so the failure is diagnosable from the message alone.
//! - **`OutputConfiguration`** / **`StreamStart`**: the device rejected the
//!   stream-out table upload or the synchronized stream start.
//! - **`StreamRead`**: a blocking read failed mid-stream.
//! - **`Interrupted`**: external cancellation (ctrl-c) observed during the
//!   read loop.
//!
//! Propagation policy: no error is retried internally. Every error is fatal
//! to the current session and is surfaced to the caller after device
//! teardown; a teardown-time error never replaces the original failure. The
//! device-reported numeric code and message are preserved in full through
//! `#[source]` chaining on [`TransportError`].

use thiserror::Error;

use crate::hardware::transport::{ConnectionType, DeviceType};

/// Convenience alias for results using the crate error type.
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Error reported by the device transport, carrying the vendor-style numeric
/// code alongside the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("device error {code}: {message}")]
pub struct TransportError {
    /// Vendor-defined numeric error code.
    pub code: i32,
    /// Human-readable description from the transport.
    pub message: String,
}

impl TransportError {
    /// Create a new transport error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Primary error type for stream acquisition.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown channel name '{0}'")]
    UnknownChannel(String),

    #[error(
        "failed to open device (device_type={device_type}, connection_type={connection_type}, \
         identifier={identifier}): {source}"
    )]
    DeviceOpen {
        device_type: DeviceType,
        connection_type: ConnectionType,
        identifier: String,
        source: TransportError,
    },

    #[error("device rejected stream-out configuration: {0}")]
    OutputConfiguration(#[source] TransportError),

    #[error("failed to start synchronized stream: {0}")]
    StreamStart(#[source] TransportError),

    #[error("stream read failed: {0}")]
    StreamRead(#[source] TransportError),

    #[error("acquisition interrupted")]
    Interrupted,

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl StreamError {
    /// Device-reported numeric code, if this error originated in the
    /// transport layer.
    pub fn device_code(&self) -> Option<i32> {
        match self {
            StreamError::DeviceOpen { source, .. }
            | StreamError::OutputConfiguration(source)
            | StreamError::StreamStart(source)
            | StreamError::StreamRead(source) => Some(source.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display_includes_code_and_message() {
        let err = TransportError::new(1279, "stream buffer overflow");
        assert_eq!(err.to_string(), "device error 1279: stream buffer overflow");
    }

    #[test]
    fn device_open_error_surfaces_selectors() {
        let err = StreamError::DeviceOpen {
            device_type: DeviceType::Any,
            connection_type: ConnectionType::Usb,
            identifier: "ANY".to_string(),
            source: TransportError::new(1227, "device not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("device_type=ANY"));
        assert!(msg.contains("connection_type=USB"));
        assert!(msg.contains("identifier=ANY"));
        assert!(msg.contains("1227"));
    }

    #[test]
    fn device_code_is_preserved_through_taxonomy() {
        let err = StreamError::StreamRead(TransportError::new(2942, "read timed out"));
        assert_eq!(err.device_code(), Some(2942));
        assert_eq!(StreamError::Interrupted.device_code(), None);
    }
}
