//! Scan planning.
//!
//! A scan is one simultaneous sample across all configured channels at a
//! single tick of the shared acquisition clock. The scan list defines the
//! interleaving order of every block the device returns: input channels
//! first, in caller-supplied order, then the stream-out pseudo-channels. The
//! read loop and the de-interleaver both rely on that convention.

use crate::error::{StreamError, StreamResult};

/// Hardware limit on simultaneously active stream-out slots.
pub const MAX_STREAM_OUT_SLOTS: usize = 4;

/// Resolved scan configuration handed to the session.
///
/// Immutable once built; all invariants (non-empty channel list, positive
/// rate, slot limit) are enforced by [`ScanPlan::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfiguration {
    channels: Vec<u32>,
    num_input_channels: usize,
    scan_rate: f64,
    scans_per_read: usize,
}

impl ScanConfiguration {
    /// Combined channel address list, inputs first, stream-out entries last.
    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    /// Number of leading input-channel entries.
    pub fn num_input_channels(&self) -> usize {
        self.num_input_channels
    }

    /// Requested scan rate in scans per second.
    pub fn scan_rate(&self) -> f64 {
        self.scan_rate
    }

    /// Scans returned by each blocking read.
    pub fn scans_per_read(&self) -> usize {
        self.scans_per_read
    }
}

/// Builder that validates and combines the input and output channel lists.
pub struct ScanPlan;

impl ScanPlan {
    /// Combine `inputs` and `outputs` into a [`ScanConfiguration`].
    ///
    /// `outputs` are the stream-out pseudo-channel addresses; this system
    /// drives exactly one, but the device supports up to
    /// [`MAX_STREAM_OUT_SLOTS`] and the limit is checked here, before any
    /// device interaction.
    pub fn new(
        inputs: &[u32],
        outputs: &[u32],
        scan_rate: f64,
        scans_per_read: usize,
    ) -> StreamResult<ScanConfiguration> {
        if inputs.is_empty() {
            return Err(StreamError::Configuration(
                "scan plan requires at least one input channel".to_string(),
            ));
        }
        if outputs.is_empty() {
            return Err(StreamError::Configuration(
                "scan plan requires at least one stream-out channel".to_string(),
            ));
        }
        if outputs.len() > MAX_STREAM_OUT_SLOTS {
            return Err(StreamError::Configuration(format!(
                "{} stream-out channels requested, device supports at most {}",
                outputs.len(),
                MAX_STREAM_OUT_SLOTS
            )));
        }
        if !scan_rate.is_finite() || scan_rate <= 0.0 {
            return Err(StreamError::Configuration(format!(
                "scan rate must be positive and finite, got {scan_rate}"
            )));
        }
        if scans_per_read == 0 {
            return Err(StreamError::Configuration(
                "scans per read must be at least 1".to_string(),
            ));
        }

        let mut channels = Vec::with_capacity(inputs.len() + outputs.len());
        channels.extend_from_slice(inputs);
        channels.extend_from_slice(outputs);

        Ok(ScanConfiguration {
            channels,
            num_input_channels: inputs.len(),
            scan_rate,
            scans_per_read,
        })
    }
}
