//! Periodic stream-out waveform tables.
//!
//! The output side of a synchronized stream replays a precomputed table of
//! voltage samples from one of the device's stream-out slots. Table
//! generation is pure: given a sample count, amplitude, and offset, the same
//! table always comes out. One full table is replayed per `samples / scan_rate`
//! seconds, so table length and scan rate together set the output frequency.

use std::f64::consts::PI;

use crate::error::{StreamError, StreamResult};
use crate::stream::scan::MAX_STREAM_OUT_SLOTS;

/// Generate one period of a sine wave: `value[i] = amplitude * sin(2π·i/n) + offset`.
///
/// `n = 1` degenerates to the single sample `offset` (sin 0 = 0). No output
/// range clamping happens here; keeping `offset ± amplitude` inside the DAC
/// span is a configuration concern.
pub fn sine_table(n: usize, amplitude: f64, offset: f64) -> Vec<f64> {
    (0..n)
        .map(|i| amplitude * (2.0 * PI * i as f64 / n as f64).sin() + offset)
        .collect()
}

/// A waveform table bound to a target register and a stream-out slot.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputWaveform {
    samples: Vec<f64>,
    target_address: u32,
    slot: u8,
}

impl OutputWaveform {
    /// Bind a sample table to `target_address` (e.g. DAC0) replayed from
    /// stream-out `slot`.
    ///
    /// Errors with `Configuration` if the table is empty or the slot is
    /// outside the device's 0–3 range.
    pub fn new(samples: Vec<f64>, target_address: u32, slot: u8) -> StreamResult<Self> {
        if samples.is_empty() {
            return Err(StreamError::Configuration(
                "output waveform must contain at least one sample".to_string(),
            ));
        }
        if (slot as usize) >= MAX_STREAM_OUT_SLOTS {
            return Err(StreamError::Configuration(format!(
                "stream-out slot {slot} out of range (0-{})",
                MAX_STREAM_OUT_SLOTS - 1
            )));
        }
        Ok(Self {
            samples,
            target_address,
            slot,
        })
    }

    /// The voltage table, in replay order.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Register address the slot drives.
    pub fn target_address(&self) -> u32 {
        self.target_address
    }

    /// Stream-out slot index (0–3).
    pub fn slot(&self) -> u8 {
        self.slot
    }
}
