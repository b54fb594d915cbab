//! Synchronized acquisition sessions.
//!
//! [`StreamSession`] orchestrates one bounded streaming run: open the device
//! through a [`DeviceGuard`], upload the periodic stream-out table, start the
//! synchronized input+output stream, accumulate interleaved blocks until the
//! run duration elapses, then de-interleave into a [`SampleMatrix`]. The
//! session is an explicit state machine:
//!
//! ```text
//! Idle → Configured → Streaming → Draining → Closed
//!            │             │          │
//!            └─────────────┴──────────┴──→ Failed
//! ```
//!
//! On every exit path out of the loop, whether the deadline was reached or a
//! device error or interrupt cut it short, the guard's teardown runs exactly
//! once before the result is returned. The device is always left stopped and
//! closed.
//!
//! The run duration is a soft deadline, checked only between reads; the scan
//! count therefore lands near, not exactly at, `run_duration × scan_rate`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{StreamError, StreamResult};
use crate::hardware::guard::DeviceGuard;
use crate::hardware::transport::{DeviceHandle, DeviceSelector, StreamTransport};
use crate::stream::deinterleave::SampleMatrix;
use crate::stream::scan::ScanConfiguration;
use crate::stream::waveform::OutputWaveform;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, device not yet configured.
    Idle,
    /// Waveform table uploaded to the device.
    Configured,
    /// Synchronized stream running, read loop active.
    Streaming,
    /// Deadline reached; residual device buffer content is discarded.
    Draining,
    /// Teardown complete, matrix delivered.
    Closed,
    /// Terminal failure; the original error was surfaced after teardown.
    Failed,
}

/// Completed acquisition: the matrix plus the rates and timing the caller
/// reports.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    /// De-interleaved readings, rows = scans, columns = input channels.
    pub matrix: SampleMatrix,
    /// Scan rate the device clock actually achieved.
    pub actual_scan_rate: f64,
    /// Wall time spent in the read loop, in microseconds.
    pub elapsed_us: u64,
}

/// Shutdown signal handed to [`StreamSession::run`].
///
/// Create with [`shutdown_channel`]; flip the sender to `true` to interrupt
/// the session at the next read-call return.
pub type ShutdownSignal = watch::Receiver<bool>;

/// Create a shutdown signal pair.
pub fn shutdown_channel() -> (watch::Sender<bool>, ShutdownSignal) {
    watch::channel(false)
}

/// Resolves only when the signal is raised. A dropped sender is not a signal.
async fn cancelled(signal: &mut ShutdownSignal) {
    loop {
        if *signal.borrow() {
            return;
        }
        if signal.changed().await.is_err() {
            // Sender gone without ever signalling: never cancel.
            std::future::pending::<()>().await;
        }
    }
}

/// One synchronized input+output streaming run.
pub struct StreamSession<T: StreamTransport + ?Sized> {
    transport: Arc<T>,
    scan: ScanConfiguration,
    waveform: OutputWaveform,
    run_duration: Duration,
    state: SessionState,
}

impl<T: StreamTransport + ?Sized> StreamSession<T> {
    /// Create a session over an already-validated scan configuration and
    /// waveform.
    pub fn new(
        transport: Arc<T>,
        scan: ScanConfiguration,
        waveform: OutputWaveform,
        run_duration: Duration,
    ) -> Self {
        Self {
            transport,
            scan,
            waveform,
            run_duration,
            state: SessionState::Idle,
        }
    }

    /// Current state-machine state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion.
    ///
    /// Opens the device matching `selector`, streams until the run duration
    /// elapses, and returns the de-interleaved matrix together with the
    /// achieved scan rate and elapsed wall time. On any failure the guard's
    /// teardown still runs exactly once and the original error is returned;
    /// a teardown-time error never replaces it.
    #[instrument(skip_all, fields(channels = self.scan.channels().len(), scan_rate = self.scan.scan_rate()))]
    pub async fn run(
        &mut self,
        selector: &DeviceSelector,
        mut shutdown: ShutdownSignal,
    ) -> StreamResult<SessionOutcome> {
        let mut guard = match DeviceGuard::open(Arc::clone(&self.transport), selector).await {
            Ok(guard) => guard,
            Err(err) => {
                self.state = SessionState::Failed;
                return Err(err);
            }
        };
        // Handle exists until teardown; drive() only runs before it.
        let Some(handle) = guard.handle() else {
            guard.teardown().await;
            self.state = SessionState::Failed;
            return Err(StreamError::Configuration(
                "device guard yielded no handle".to_string(),
            ));
        };

        let result = self.drive(handle, &mut shutdown).await;
        guard.teardown().await;

        match result {
            Ok(outcome) => {
                self.state = SessionState::Closed;
                info!(
                    rows = outcome.matrix.rows(),
                    columns = outcome.matrix.columns(),
                    elapsed_us = outcome.elapsed_us,
                    "session closed"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.state = SessionState::Failed;
                warn!(%err, "session failed, device torn down");
                Err(err)
            }
        }
    }

    /// Configure, stream, and drain. Teardown is the caller's job so it runs
    /// exactly once whether this returns `Ok` or `Err`.
    async fn drive(
        &mut self,
        handle: DeviceHandle,
        shutdown: &mut ShutdownSignal,
    ) -> StreamResult<SessionOutcome> {
        self.transport
            .configure_output_stream(handle, &self.waveform, self.scan.scan_rate())
            .await
            .map_err(StreamError::OutputConfiguration)?;
        self.state = SessionState::Configured;
        debug!(
            slot = self.waveform.slot(),
            target = self.waveform.target_address(),
            table_len = self.waveform.samples().len(),
            "stream-out table uploaded"
        );

        let actual_scan_rate = self
            .transport
            .start_stream(
                handle,
                self.scan.scans_per_read(),
                self.scan.channels(),
                self.scan.scan_rate(),
            )
            .await
            .map_err(StreamError::StreamStart)?;
        self.state = SessionState::Streaming;
        info!(
            requested = self.scan.scan_rate(),
            actual = actual_scan_rate,
            run_secs = self.run_duration.as_secs_f64(),
            "stream started"
        );

        let (raw, elapsed_us) = self.read_loop(handle, shutdown).await?;
        self.state = SessionState::Draining;

        let matrix = SampleMatrix::deinterleave(&raw, self.scan.num_input_channels());
        Ok(SessionOutcome {
            matrix,
            actual_scan_rate,
            elapsed_us,
        })
    }

    /// Accumulate interleaved blocks until the deadline or a failure.
    /// Returns the raw buffer and the elapsed wall time at loop exit.
    async fn read_loop(
        &mut self,
        handle: DeviceHandle,
        shutdown: &mut ShutdownSignal,
    ) -> StreamResult<(Vec<f64>, u64)> {
        // Only the input channels' share of each scan is recorded; the
        // stream-out slots' readback values are discarded.
        let stride = self.scan.channels().len();
        let num_inputs = self.scan.num_input_channels();
        let deadline_us = self.run_duration.as_micros() as u64;
        let start_us = self.transport.monotonic_tick();

        let mut raw: Vec<f64> = Vec::new();
        loop {
            let block = tokio::select! {
                biased;
                _ = cancelled(shutdown) => {
                    debug!("interrupt observed in read loop");
                    return Err(StreamError::Interrupted);
                }
                read = self.transport.read_stream(handle) => {
                    read.map_err(StreamError::StreamRead)?
                }
            };

            for scan in block.chunks(stride) {
                raw.extend_from_slice(&scan[..num_inputs.min(scan.len())]);
            }

            let elapsed = self.transport.monotonic_tick().saturating_sub(start_us);
            debug!(
                elapsed_us = elapsed,
                samples = raw.len(),
                "read block accumulated"
            );
            if elapsed >= deadline_us {
                return Ok((raw, elapsed));
            }
        }
    }
}
