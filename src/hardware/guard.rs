//! Scoped device lifecycle management.
//!
//! [`DeviceGuard`] owns the one external resource the session must always
//! release: the open device handle. It opens the device on construction and
//! exposes the handle for the guard's lifetime; [`DeviceGuard::teardown`]
//! performs a best-effort stream stop and close exactly once, on whichever
//! exit path reaches it first. Teardown never raises: stop/close failures are
//! logged and swallowed so they cannot mask the error that triggered the
//! teardown.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{StreamError, StreamResult};
use crate::hardware::transport::{DeviceHandle, DeviceSelector, StreamTransport};

/// Scoped acquisition of a [`DeviceHandle`].
pub struct DeviceGuard<T: StreamTransport + ?Sized> {
    transport: Arc<T>,
    handle: Option<DeviceHandle>,
}

impl<T: StreamTransport + ?Sized> DeviceGuard<T> {
    /// Open a device matching `selector`.
    ///
    /// Fails with [`StreamError::DeviceOpen`] carrying the selector values if
    /// no matching device is found. On success the device identity is logged
    /// once.
    pub async fn open(transport: Arc<T>, selector: &DeviceSelector) -> StreamResult<Self> {
        let handle = transport.open(selector).await.map_err(|source| {
            StreamError::DeviceOpen {
                device_type: selector.device_type,
                connection_type: selector.connection_type,
                identifier: selector.identifier.clone(),
                source,
            }
        })?;

        match transport.device_info(handle).await {
            Ok(device) => info!(
                handle = handle.raw(),
                device_type = %device.device_type,
                connection_type = %device.connection_type,
                serial_number = device.serial_number,
                "opened device"
            ),
            Err(err) => warn!(handle = handle.raw(), %err, "device info query failed"),
        }

        Ok(Self {
            transport,
            handle: Some(handle),
        })
    }

    /// The open handle, or `None` once torn down.
    pub fn handle(&self) -> Option<DeviceHandle> {
        self.handle
    }

    /// Whether teardown already ran.
    pub fn is_torn_down(&self) -> bool {
        self.handle.is_none()
    }

    /// Best-effort stream stop and close.
    ///
    /// Runs at most once; a second call is a no-op. Secondary errors from the
    /// device (stop on a stream that never started, close hiccups) are logged
    /// at `warn` and discarded, never surfaced.
    pub async fn teardown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if let Err(err) = self.transport.stop_stream(handle).await {
            warn!(handle = handle.raw(), %err, "stream stop during teardown failed");
        }
        if let Err(err) = self.transport.close(handle).await {
            warn!(handle = handle.raw(), %err, "device close during teardown failed");
        } else {
            info!(handle = handle.raw(), "device closed");
        }
    }
}

impl<T: StreamTransport + ?Sized> Drop for DeviceGuard<T> {
    fn drop(&mut self) {
        // Async close cannot run here; the session is responsible for calling
        // teardown() on every exit path, so a live handle at drop is a bug.
        if let Some(handle) = self.handle {
            warn!(
                handle = handle.raw(),
                "device guard dropped without teardown, handle leaked"
            );
        }
    }
}
