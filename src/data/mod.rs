//! Data persistence.

pub mod storage;

pub use storage::CsvWriter;
