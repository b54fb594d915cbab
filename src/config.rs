//! Typed configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. a TOML file (`config/stream.toml` by default)
//! 2. environment variables prefixed with `STREAM_DAQ_`, with double
//!    underscores separating nested fields
//!    (e.g. `STREAM_DAQ_APPLICATION__LOG_LEVEL=debug`)
//!
//! Parsing catches shape errors; [`StreamConfig::validate`] catches semantic
//! ones, values that parse fine but are logically wrong, like a waveform
//! whose `offset ± amplitude` leaves the DAC's output span.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{StreamError, StreamResult};
use crate::hardware::transport::{ConnectionType, DeviceSelector, DeviceType};
use crate::stream::scan::MAX_STREAM_OUT_SLOTS;

/// DAC output span of the supported devices, volts.
const DAC_RANGE_VOLTS: (f64, f64) = (0.0, 5.0);

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Device selection and acquisition timing
    pub acquisition: AcquisitionConfig,
    /// Stream-out waveform settings
    pub output: OutputConfig,
    /// Persistence settings
    pub storage: StorageConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Device selection and acquisition timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Device model to open
    #[serde(default)]
    pub device_type: DeviceType,
    /// Connection medium
    #[serde(default)]
    pub connection_type: ConnectionType,
    /// Serial number, IP address, or "ANY"
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Requested scan rate, scans per second
    pub scan_rate: f64,
    /// Scans returned per blocking read
    pub scans_per_read: usize,
    /// Run duration in seconds
    pub run_duration_secs: f64,
    /// Input channels, in scan order (e.g. ["AIN0", "AIN3"])
    pub input_channels: Vec<String>,
}

/// Stream-out waveform configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Stream-out pseudo-channel (e.g. "STREAM_OUT0")
    #[serde(default = "default_stream_out")]
    pub stream_out: String,
    /// Target register the slot drives (e.g. "DAC0")
    #[serde(default = "default_target")]
    pub target: String,
    /// Waveform table length; with the scan rate this sets the output frequency
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Sine amplitude, volts
    pub amplitude: f64,
    /// Sine offset, volts
    pub offset: f64,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for acquisition CSV files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

// Default value functions
fn default_app_name() -> String {
    "stream_daq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_identifier() -> String {
    "ANY".to_string()
}

fn default_stream_out() -> String {
    "STREAM_OUT0".to_string()
}

fn default_target() -> String {
    "DAC0".to_string()
}

fn default_samples() -> usize {
    500
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

impl StreamConfig {
    /// Load configuration from `config/stream.toml` and environment
    /// variables.
    pub fn load() -> StreamResult<Self> {
        Self::load_from("config/stream.toml")
    }

    /// Load configuration from a specific file path, with `STREAM_DAQ_`
    /// environment overrides applied on top.
    pub fn load_from<P: AsRef<Path>>(path: P) -> StreamResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("STREAM_DAQ_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> StreamResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(StreamError::Configuration(format!(
                "invalid log_level '{}', must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let acq = &self.acquisition;
        if !(acq.scan_rate.is_finite() && acq.scan_rate > 0.0) {
            return Err(StreamError::Configuration(format!(
                "scan_rate must be positive, got {}",
                acq.scan_rate
            )));
        }
        if acq.scans_per_read == 0 {
            return Err(StreamError::Configuration(
                "scans_per_read must be at least 1".to_string(),
            ));
        }
        if !(acq.run_duration_secs.is_finite() && acq.run_duration_secs > 0.0) {
            return Err(StreamError::Configuration(format!(
                "run_duration_secs must be positive, got {}",
                acq.run_duration_secs
            )));
        }
        if acq.input_channels.is_empty() {
            return Err(StreamError::Configuration(
                "at least one input channel is required".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for channel in &acq.input_channels {
            if !seen.insert(channel) {
                return Err(StreamError::Configuration(format!(
                    "duplicate input channel: {channel}"
                )));
            }
        }

        let out = &self.output;
        if out.samples == 0 {
            return Err(StreamError::Configuration(
                "output.samples must be at least 1".to_string(),
            ));
        }
        if !out.stream_out.starts_with("STREAM_OUT") {
            return Err(StreamError::Configuration(format!(
                "output.stream_out must name one of STREAM_OUT0-STREAM_OUT{}, got '{}'",
                MAX_STREAM_OUT_SLOTS - 1,
                out.stream_out
            )));
        }
        let (low, high) = DAC_RANGE_VOLTS;
        if out.offset - out.amplitude < low || out.offset + out.amplitude > high {
            return Err(StreamError::Configuration(format!(
                "waveform spans {:.3} V to {:.3} V, outside the DAC range {low:.1}-{high:.1} V",
                out.offset - out.amplitude,
                out.offset + out.amplitude
            )));
        }

        Ok(())
    }

    /// Device selector built from the acquisition section.
    pub fn device_selector(&self) -> DeviceSelector {
        DeviceSelector {
            device_type: self.acquisition.device_type,
            connection_type: self.acquisition.connection_type,
            identifier: self.acquisition.identifier.clone(),
        }
    }

    /// Run duration as a [`std::time::Duration`].
    pub fn run_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.acquisition.run_duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Toml as TomlProvider;

    const GOOD: &str = r#"
        [application]
        name = "stream_daq"
        log_level = "info"

        [acquisition]
        scan_rate = 10000.0
        scans_per_read = 5000
        run_duration_secs = 3.0
        input_channels = ["AIN0", "AIN3", "AIN2", "AIN1"]

        [output]
        amplitude = 1.0
        offset = 2.5

        [storage]
        output_dir = "data"
    "#;

    fn parse(toml: &str) -> StreamConfig {
        Figment::new()
            .merge(TomlProvider::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn parses_and_validates_complete_config() {
        let config = parse(GOOD);
        config.validate().unwrap();
        assert_eq!(config.acquisition.input_channels.len(), 4);
        // Defaults fill the omitted keys.
        assert_eq!(config.output.stream_out, "STREAM_OUT0");
        assert_eq!(config.output.target, "DAC0");
        assert_eq!(config.output.samples, 500);
        assert_eq!(config.acquisition.identifier, "ANY");
    }

    #[test]
    fn selector_reflects_acquisition_section() {
        let config = parse(GOOD);
        let selector = config.device_selector();
        assert_eq!(selector.device_type, DeviceType::Any);
        assert_eq!(selector.identifier, "ANY");
    }

    #[test]
    fn rejects_invalid_log_level() {
        let mut config = parse(GOOD);
        config.application.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_waveform_outside_dac_range() {
        let mut config = parse(GOOD);
        config.output.amplitude = 3.0; // 2.5 ± 3.0 leaves 0-5 V
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DAC range"));
    }

    #[test]
    fn rejects_duplicate_input_channels() {
        let mut config = parse(GOOD);
        config.acquisition.input_channels = vec!["AIN0".into(), "AIN0".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_values() {
        let mut config = parse(GOOD);
        config.acquisition.scans_per_read = 0;
        assert!(config.validate().is_err());

        let mut config = parse(GOOD);
        config.output.samples = 0;
        assert!(config.validate().is_err());

        let mut config = parse(GOOD);
        config.acquisition.run_duration_secs = 0.0;
        assert!(config.validate().is_err());
    }
}
