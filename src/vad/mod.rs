//! Energy-based voice activity detection
//!
//! The detector decides speech vs. silence from the RMS energy of each
//! buffer against a fixed decibel threshold. Speaking state is sticky: it is
//! entered on the first loud buffer and only left through the stop decision
//! (`should_stop_recording`) or an explicit `reset()`.

mod config;
mod detector;
mod scan;

pub use config::VadConfig;
pub use detector::{energy_db, VoiceActivityDetector};
pub use scan::{scan_samples, ScanReport};
