//! Mock stream transport.
//!
//! A full in-process simulation of a T-series device for developing and
//! testing acquisition sessions without physical hardware. The mock keeps
//! real handle bookkeeping (operations on unopened or closed handles fail
//! with coded errors), accepts one periodic stream-out table, and synthesizes
//! deterministic interleaved sample blocks.
//!
//! Instead of sleeping to imitate device pacing, the mock advances a
//! *virtual* monotonic clock by `scans_per_read / scan_rate` per read. A
//! three-second acquisition therefore completes in microseconds of wall time
//! while elapsed-time bookkeeping behaves exactly as with hardware.
//!
//! Failure injection:
//! - [`MockStreamDevice::fail_open`] rejects the open call
//! - [`MockStreamDevice::fail_read_at`] errors on the n-th read
//!
//! Call counters (`open_calls`, `stop_calls`, `close_calls`) let tests prove
//! the teardown path ran exactly once.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rand::Rng;

use crate::error::TransportError;
use crate::hardware::transport::{
    ConnectionType, DeviceHandle, DeviceInfo, DeviceSelector, DeviceType, StreamTransport,
};
use crate::stream::waveform::OutputWaveform;

/// Mock-local error codes, vendor-flavored for realistic log output.
pub mod error_code {
    /// No device matched the open selectors.
    pub const DEVICE_NOT_FOUND: i32 = 1227;
    /// Operation on a handle that is not open.
    pub const INVALID_HANDLE: i32 = 1224;
    /// Stream operation while no stream is running.
    pub const STREAM_NOT_RUNNING: i32 = 1303;
    /// Stream start while one is already running.
    pub const STREAM_ALREADY_RUNNING: i32 = 1304;
    /// Injected mid-stream read failure.
    pub const SYNCHRONIZATION_LOST: i32 = 1306;
}

#[derive(Debug)]
struct StreamState {
    channels: Vec<u32>,
    scans_per_read: usize,
    scan_rate: f64,
    scans_emitted: u64,
    reads_served: u32,
}

#[derive(Debug)]
struct OpenDevice {
    handle: i32,
    waveform: Option<(u8, u32, Vec<f64>)>,
    stream: Option<StreamState>,
}

#[derive(Debug, Default)]
struct State {
    next_handle: i32,
    device: Option<OpenDevice>,
    clock_us: u64,
    open_calls: u32,
    stop_calls: u32,
    close_calls: u32,
    fail_open: bool,
    fail_read_at: Option<u32>,
    noise: f64,
}

/// Simulated stream-capable device.
///
/// Cloning shares the underlying device state, so a test can keep a handle on
/// the counters while the session owns the transport.
#[derive(Clone, Default)]
pub struct MockStreamDevice {
    state: Arc<Mutex<State>>,
}

impl MockStreamDevice {
    /// Create an idle mock device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `open` call fail with `DEVICE_NOT_FOUND`.
    pub fn fail_open(self) -> Self {
        self.state_mut().fail_open = true;
        self
    }

    /// Make the `n`-th `read_stream` call (1-based) fail with
    /// `SYNCHRONIZATION_LOST`.
    pub fn fail_read_at(self, n: u32) -> Self {
        self.state_mut().fail_read_at = Some(n);
        self
    }

    /// Add uniform noise of the given amplitude to synthesized samples.
    /// Defaults to zero so tests stay deterministic.
    pub fn with_noise(self, amplitude: f64) -> Self {
        self.state_mut().noise = amplitude;
        self
    }

    /// Number of `open` calls observed.
    pub fn open_calls(&self) -> u32 {
        self.state_mut().open_calls
    }

    /// Number of `stop_stream` calls observed.
    pub fn stop_calls(&self) -> u32 {
        self.state_mut().stop_calls
    }

    /// Number of `close` calls observed.
    pub fn close_calls(&self) -> u32 {
        self.state_mut().close_calls
    }

    /// Whether a stream is currently running.
    pub fn is_streaming(&self) -> bool {
        self.state_mut()
            .device
            .as_ref()
            .is_some_and(|d| d.stream.is_some())
    }

    fn state_mut(&self) -> MutexGuard<'_, State> {
        // Poisoning only happens if a test panicked mid-call; the state is
        // still consistent enough to inspect.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_handle(state: &State, handle: DeviceHandle) -> Result<(), TransportError> {
        match &state.device {
            Some(device) if device.handle == handle.raw() => Ok(()),
            _ => Err(TransportError::new(
                error_code::INVALID_HANDLE,
                format!("handle {} is not open", handle.raw()),
            )),
        }
    }
}

#[async_trait]
impl StreamTransport for MockStreamDevice {
    async fn open(&self, selector: &DeviceSelector) -> Result<DeviceHandle, TransportError> {
        let mut state = self.state_mut();
        state.open_calls += 1;
        if state.fail_open {
            return Err(TransportError::new(
                error_code::DEVICE_NOT_FOUND,
                format!(
                    "no {} device found via {} matching '{}'",
                    selector.device_type, selector.connection_type, selector.identifier
                ),
            ));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.device = Some(OpenDevice {
            handle,
            waveform: None,
            stream: None,
        });
        Ok(DeviceHandle(handle))
    }

    async fn device_info(&self, handle: DeviceHandle) -> Result<DeviceInfo, TransportError> {
        let state = self.state_mut();
        Self::check_handle(&state, handle)?;
        Ok(DeviceInfo {
            device_type: DeviceType::T7,
            connection_type: ConnectionType::Usb,
            serial_number: 470_010_999,
        })
    }

    async fn configure_output_stream(
        &self,
        handle: DeviceHandle,
        waveform: &OutputWaveform,
        _scan_rate: f64,
    ) -> Result<(), TransportError> {
        let mut state = self.state_mut();
        Self::check_handle(&state, handle)?;
        let device = state.device.as_mut().ok_or_else(|| {
            TransportError::new(error_code::INVALID_HANDLE, "device closed")
        })?;
        device.waveform = Some((
            waveform.slot(),
            waveform.target_address(),
            waveform.samples().to_vec(),
        ));
        Ok(())
    }

    async fn start_stream(
        &self,
        handle: DeviceHandle,
        scans_per_read: usize,
        channels: &[u32],
        requested_rate: f64,
    ) -> Result<f64, TransportError> {
        let mut state = self.state_mut();
        Self::check_handle(&state, handle)?;
        let device = state.device.as_mut().ok_or_else(|| {
            TransportError::new(error_code::INVALID_HANDLE, "device closed")
        })?;
        if device.stream.is_some() {
            return Err(TransportError::new(
                error_code::STREAM_ALREADY_RUNNING,
                "a stream is already running on this device",
            ));
        }
        device.stream = Some(StreamState {
            channels: channels.to_vec(),
            scans_per_read,
            scan_rate: requested_rate,
            scans_emitted: 0,
            reads_served: 0,
        });
        // Device clock granularity: the achieved rate lands slightly off the
        // request, like real hardware.
        Ok(requested_rate * 0.9999)
    }

    async fn read_stream(&self, handle: DeviceHandle) -> Result<Vec<f64>, TransportError> {
        let mut state = self.state_mut();
        Self::check_handle(&state, handle)?;

        let fail_read_at = state.fail_read_at;
        let noise = state.noise;

        let device = state.device.as_mut().ok_or_else(|| {
            TransportError::new(error_code::INVALID_HANDLE, "device closed")
        })?;
        let table = device
            .waveform
            .as_ref()
            .map(|(_, _, samples)| samples.clone());
        let stream = device.stream.as_mut().ok_or_else(|| {
            TransportError::new(error_code::STREAM_NOT_RUNNING, "stream not started")
        })?;

        stream.reads_served += 1;
        if fail_read_at == Some(stream.reads_served) {
            return Err(TransportError::new(
                error_code::SYNCHRONIZATION_LOST,
                format!("stream desynchronized on read {}", stream.reads_served),
            ));
        }

        let num_channels = stream.channels.len();
        let mut block = Vec::with_capacity(stream.scans_per_read * num_channels);
        let mut rng = rand::thread_rng();
        for s in 0..stream.scans_per_read {
            let scan = stream.scans_emitted + s as u64;
            for (position, _address) in stream.channels.iter().enumerate() {
                // Inputs loop back the stream-out table with a small
                // per-channel offset; stream-out slots read back as the scan
                // index so block boundaries are visible in tests.
                let value = match &table {
                    Some(samples) if position < num_channels - 1 => {
                        samples[scan as usize % samples.len()] + position as f64 * 1e-3
                    }
                    _ => scan as f64,
                };
                let jitter = if noise > 0.0 {
                    rng.gen_range(-noise..noise)
                } else {
                    0.0
                };
                block.push(value + jitter);
            }
        }
        stream.scans_emitted += stream.scans_per_read as u64;

        // Advance the virtual clock by the wall time a real device would
        // spend buffering this block.
        let block_us = (stream.scans_per_read as f64 / stream.scan_rate * 1e6) as u64;
        state.clock_us += block_us;

        Ok(block)
    }

    async fn stop_stream(&self, handle: DeviceHandle) -> Result<(), TransportError> {
        let mut state = self.state_mut();
        state.stop_calls += 1;
        Self::check_handle(&state, handle)?;
        let device = state.device.as_mut().ok_or_else(|| {
            TransportError::new(error_code::INVALID_HANDLE, "device closed")
        })?;
        if device.stream.take().is_none() {
            return Err(TransportError::new(
                error_code::STREAM_NOT_RUNNING,
                "no stream to stop",
            ));
        }
        Ok(())
    }

    async fn close(&self, handle: DeviceHandle) -> Result<(), TransportError> {
        let mut state = self.state_mut();
        state.close_calls += 1;
        Self::check_handle(&state, handle)?;
        state.device = None;
        Ok(())
    }

    fn monotonic_tick(&self) -> u64 {
        self.state_mut().clock_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn opened() -> (MockStreamDevice, DeviceHandle) {
        let device = MockStreamDevice::new();
        let handle = device.open(&DeviceSelector::any()).await.unwrap();
        (device, handle)
    }

    #[tokio::test]
    async fn operations_on_unopened_handle_fail() {
        let device = MockStreamDevice::new();
        let bogus = DeviceHandle(99);
        let err = device.read_stream(bogus).await.unwrap_err();
        assert_eq!(err.code, error_code::INVALID_HANDLE);
        let err = device.close(bogus).await.unwrap_err();
        assert_eq!(err.code, error_code::INVALID_HANDLE);
    }

    #[tokio::test]
    async fn closed_handle_is_invalid() {
        let (device, handle) = opened().await;
        device.close(handle).await.unwrap();
        let err = device.device_info(handle).await.unwrap_err();
        assert_eq!(err.code, error_code::INVALID_HANDLE);
    }

    #[tokio::test]
    async fn read_before_start_fails() {
        let (device, handle) = opened().await;
        let err = device.read_stream(handle).await.unwrap_err();
        assert_eq!(err.code, error_code::STREAM_NOT_RUNNING);
    }

    #[tokio::test]
    async fn read_block_is_interleaved_and_clock_advances() {
        let (device, handle) = opened().await;
        let actual = device
            .start_stream(handle, 10, &[0, 2, 4800], 1000.0)
            .await
            .unwrap();
        assert!((actual - 999.9).abs() < 1e-6);

        let before = device.monotonic_tick();
        let block = device.read_stream(handle).await.unwrap();
        assert_eq!(block.len(), 10 * 3);
        // Stream-out slot (last position) reports the scan index.
        assert_eq!(block[2], 0.0);
        assert_eq!(block[5], 1.0);
        // 10 scans at 1 kHz: 10 ms of virtual time.
        assert_eq!(device.monotonic_tick() - before, 10_000);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (device, handle) = opened().await;
        device
            .start_stream(handle, 10, &[0, 4800], 1000.0)
            .await
            .unwrap();
        let err = device
            .start_stream(handle, 10, &[0, 4800], 1000.0)
            .await
            .unwrap_err();
        assert_eq!(err.code, error_code::STREAM_ALREADY_RUNNING);
    }

    #[tokio::test]
    async fn injected_read_failure_fires_on_requested_read() {
        let device = MockStreamDevice::new().fail_read_at(3);
        let handle = device.open(&DeviceSelector::any()).await.unwrap();
        device
            .start_stream(handle, 5, &[0, 4800], 1000.0)
            .await
            .unwrap();
        device.read_stream(handle).await.unwrap();
        device.read_stream(handle).await.unwrap();
        let err = device.read_stream(handle).await.unwrap_err();
        assert_eq!(err.code, error_code::SYNCHRONIZATION_LOST);
    }

    #[tokio::test]
    async fn loopback_reflects_configured_waveform() {
        let (device, handle) = opened().await;
        let waveform =
            OutputWaveform::new(vec![1.0, 2.0, 3.0], crate::hardware::channels::DAC_BASE_ADDRESS, 0)
                .unwrap();
        device
            .configure_output_stream(handle, &waveform, 1000.0)
            .await
            .unwrap();
        device
            .start_stream(handle, 4, &[0, 4800], 1000.0)
            .await
            .unwrap();
        let block = device.read_stream(handle).await.unwrap();
        // Input channel at position 0 replays the table.
        assert_eq!(block[0], 1.0);
        assert_eq!(block[2], 2.0);
        assert_eq!(block[4], 3.0);
        assert_eq!(block[6], 1.0);
    }
}
