//! CLI entry point for stream_daq.
//!
//! Loads the acquisition configuration, runs one synchronized streaming
//! session against the mock transport, and writes the de-interleaved matrix
//! to CSV. Ctrl-C interrupts the session cleanly: the device is stopped and
//! closed before the process exits with the `Interrupted` error.
//!
//! # Usage
//!
//! ```bash
//! stream_daq --config config/stream.toml
//! stream_daq --duration 10 --output-dir /tmp/runs
//! STREAM_DAQ_APPLICATION__LOG_LEVEL=debug stream_daq
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use stream_daq::config::StreamConfig;
use stream_daq::data::CsvWriter;
use stream_daq::hardware::channels;
use stream_daq::hardware::mock::MockStreamDevice;
use stream_daq::logging;
use stream_daq::stream::session::{shutdown_channel, StreamSession};
use stream_daq::stream::waveform::{sine_table, OutputWaveform};
use stream_daq::stream::ScanPlan;

#[derive(Parser)]
#[command(name = "stream_daq")]
#[command(about = "Synchronized analog streaming with periodic stream-out", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config/stream.toml")]
    config: PathBuf,

    /// Override the configured run duration, seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Override the configured CSV output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Simulated input noise amplitude, volts
    #[arg(long, default_value_t = 0.002)]
    noise: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = StreamConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(duration) = cli.duration {
        config.acquisition.run_duration_secs = duration;
    }
    if let Some(output_dir) = cli.output_dir {
        config.storage.output_dir = output_dir;
    }
    config.validate()?;
    logging::init_from_config(&config)?;

    info!(
        name = config.application.name,
        config = %cli.config.display(),
        "starting acquisition"
    );

    // Collaborator setup: resolve symbolic names to register addresses and
    // build the immutable session inputs.
    let input_addresses = channels::resolve_names(&config.acquisition.input_channels)?;
    let output_address = channels::resolve_name(&config.output.stream_out)?;
    let target_address = channels::resolve_name(&config.output.target)?;
    let slot = channels::stream_out_slot(&config.output.stream_out)?;

    let scan = ScanPlan::new(
        &input_addresses,
        &[output_address],
        config.acquisition.scan_rate,
        config.acquisition.scans_per_read,
    )?;
    let table = sine_table(
        config.output.samples,
        config.output.amplitude,
        config.output.offset,
    );
    let waveform = OutputWaveform::new(table, target_address, slot)?;

    let transport = Arc::new(MockStreamDevice::new().with_noise(cli.noise));
    let mut session = StreamSession::new(
        Arc::clone(&transport),
        scan,
        waveform,
        config.run_duration(),
    );

    // Route ctrl-c into the session's shutdown signal; the read loop observes
    // it at the next read return and tears the device down before returning.
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping session");
            let _ = shutdown_tx.send(true);
        }
    });

    let selector = config.device_selector();
    let outcome = match session.run(&selector, shutdown_rx).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(%err, "acquisition failed");
            return Err(err.into());
        }
    };

    info!(
        scans = outcome.matrix.rows(),
        channels = outcome.matrix.columns(),
        actual_scan_rate = outcome.actual_scan_rate,
        elapsed_us = outcome.elapsed_us,
        "acquisition complete"
    );

    let writer = CsvWriter::new(&config.storage.output_dir);
    let path = writer.write_session(&outcome, &config.acquisition.input_channels)?;
    println!(
        "Wrote {} scans x {} channels to {} ({:.2} Hz achieved, {:.3} s elapsed)",
        outcome.matrix.rows(),
        outcome.matrix.columns(),
        path.display(),
        outcome.actual_scan_rate,
        outcome.elapsed_us as f64 / 1e6
    );

    Ok(())
}
