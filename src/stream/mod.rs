//! Streaming core: waveform tables, scan planning, the acquisition session,
//! and de-interleaving.

pub mod deinterleave;
pub mod scan;
pub mod session;
pub mod waveform;

pub use deinterleave::SampleMatrix;
pub use scan::{ScanConfiguration, ScanPlan};
pub use session::{SessionOutcome, SessionState, StreamSession};
pub use waveform::OutputWaveform;
