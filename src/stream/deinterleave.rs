//! De-interleaving of raw sample buffers.
//!
//! The device returns samples interleaved in scan-list order:
//! `(scan0·chan0, scan0·chan1, …, scan1·chan0, …)`. [`SampleMatrix`] reshapes
//! that flat sequence into `(scan, channel)` indexing. This is a pure
//! reshape: no aggregation, no unit conversion.

/// Row-major matrix of readings: rows are scans, columns are input channels.
///
/// Produced once from the session's raw buffer and immutable afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    data: Vec<f64>,
    rows: usize,
    columns: usize,
}

impl SampleMatrix {
    /// Reshape a flat interleaved buffer into a matrix with `columns`
    /// channels.
    ///
    /// Allocates `ceil(len / columns)` rows so a final partial scan (a read
    /// that ended mid-scan) lands in a real row instead of out of bounds; the
    /// unset trailing cells of that row stay at 0.0.
    ///
    /// # Panics
    /// Panics if `columns` is zero. The scan plan guarantees at least one
    /// input channel before a session can produce a buffer.
    pub fn deinterleave(raw: &[f64], columns: usize) -> Self {
        assert!(columns > 0, "channel count must be positive");
        let rows = raw.len().div_ceil(columns);
        let mut data = vec![0.0; rows * columns];
        data[..raw.len()].copy_from_slice(raw);
        Self {
            data,
            rows,
            columns,
        }
    }

    /// Number of scans (rows).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of input channels (columns).
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Reading for `(scan, channel)`.
    pub fn get(&self, row: usize, column: usize) -> f64 {
        assert!(row < self.rows && column < self.columns, "index out of range");
        self.data[row * self.columns + column]
    }

    /// One scan as a channel-ordered slice.
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.columns;
        &self.data[start..start + self.columns]
    }

    /// Iterate over scans in acquisition order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.columns)
    }
}
