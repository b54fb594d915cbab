//! # stream_daq
//!
//! Synchronized analog stream acquisition for T-series DAQ hardware: a
//! configurable set of analog input channels is sampled while one analog
//! output is driven by a precomputed periodic waveform, both on the device's
//! shared stream clock so input and output stay sample-synchronized.
//!
//! ## Crate structure
//!
//! - **`config`**: strongly-typed configuration loaded from TOML and
//!   environment variables (figment).
//! - **`error`**: the `StreamError` taxonomy; every failure a session can
//!   surface, with device codes preserved.
//! - **`logging`**: tracing subscriber setup.
//! - **`hardware`**: the `StreamTransport` device seam, the Modbus channel
//!   name resolver, the mock device, and the lifecycle guard that guarantees
//!   stream stop and handle close on every exit path.
//! - **`stream`**: the acquisition core: waveform table generation, scan
//!   planning, the `StreamSession` state machine with its bounded read loop,
//!   and de-interleaving of raw buffers into a per-channel matrix.
//! - **`data`**: CSV persistence for completed acquisitions.

pub mod config;
pub mod data;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod stream;

pub use error::{StreamError, StreamResult};
