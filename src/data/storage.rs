//! Acquisition data storage writers.
//!
//! [`CsvWriter`] persists a completed sample matrix: `# `-prefixed
//! metadata comment lines, a header row of channel names, then one record per
//! scan. Built only with the `storage_csv` feature (on by default); the stub
//! otherwise reports [`StreamError::FeatureNotEnabled`].

use std::path::PathBuf;

use crate::error::{StreamError, StreamResult};
use crate::stream::session::SessionOutcome;

/// A writer for CSV acquisition files.
#[cfg(feature = "storage_csv")]
pub struct CsvWriter {
    output_dir: PathBuf,
}

#[cfg(feature = "storage_csv")]
impl CsvWriter {
    /// Writer targeting `output_dir`, created on first write if missing.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write a completed session to `<output_dir>/stream_<timestamp>.csv`.
    ///
    /// Returns the path of the created file.
    pub fn write_session(
        &self,
        outcome: &SessionOutcome,
        channel_names: &[String],
    ) -> StreamResult<PathBuf> {
        if channel_names.len() != outcome.matrix.columns() {
            return Err(StreamError::Storage(format!(
                "{} channel names for a {}-column matrix",
                channel_names.len(),
                outcome.matrix.columns()
            )));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let file_name = format!(
            "stream_{}.csv",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(file_name);

        let mut file = std::fs::File::create(&path)?;
        write_metadata(&mut file, outcome)?;

        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(channel_names)
            .map_err(|e| StreamError::Storage(e.to_string()))?;
        for row in outcome.matrix.iter_rows() {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(|e| StreamError::Storage(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| StreamError::Storage(e.to_string()))?;

        tracing::info!(path = %path.display(), rows = outcome.matrix.rows(), "acquisition written");
        Ok(path)
    }
}

#[cfg(feature = "storage_csv")]
fn write_metadata(file: &mut std::fs::File, outcome: &SessionOutcome) -> StreamResult<()> {
    use std::io::Write;

    writeln!(file, "# recorded: {}", chrono::Utc::now().to_rfc3339())?;
    writeln!(file, "# actual_scan_rate_hz: {}", outcome.actual_scan_rate)?;
    writeln!(file, "# elapsed_us: {}", outcome.elapsed_us)?;
    writeln!(file, "# scans: {}", outcome.matrix.rows())?;
    Ok(())
}

/// Stub when the `storage_csv` feature is disabled.
#[cfg(not(feature = "storage_csv"))]
pub struct CsvWriter;

#[cfg(not(feature = "storage_csv"))]
impl CsvWriter {
    /// Stub constructor; the path is ignored.
    pub fn new(_output_dir: impl Into<PathBuf>) -> Self {
        Self
    }

    /// Always fails: the `storage_csv` feature is not compiled in.
    pub fn write_session(
        &self,
        _outcome: &SessionOutcome,
        _channel_names: &[String],
    ) -> StreamResult<PathBuf> {
        Err(StreamError::FeatureNotEnabled("storage_csv".to_string()))
    }
}
