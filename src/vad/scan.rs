use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::config::VadConfig;
use super::detector::VoiceActivityDetector;
use crate::clock::ManualClock;

/// Outcome of replaying a recording through the detector
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    /// Offset of the first window classified as speech
    pub speech_started_at: Option<Duration>,

    /// Offset at which a live session would have auto-stopped
    pub auto_stop_at: Option<Duration>,

    /// Number of analysis windows processed
    pub windows: usize,

    /// Loudest window seen, in dBFS
    pub peak_db: Option<f32>,
}

/// Replay mono samples in `analysis_window_samples` windows on a manual clock
///
/// Each window is analyzed at its end offset, once its samples have been
/// captured, and the auto-stop decision is evaluated right after, exactly as
/// the live poll loop sees buffers. Onset is reported at the start of the
/// first loud window. Scanning ends at the first auto-stop.
pub fn scan_samples(config: &VadConfig, samples: &[f32], sample_rate: u32) -> ScanReport {
    let mut report = ScanReport::default();
    if sample_rate == 0 {
        return report;
    }

    let clock = Arc::new(ManualClock::new());
    let mut vad = VoiceActivityDetector::with_clock(config.clone(), clock.clone());
    vad.reset();

    let window = config.analysis_window_samples.max(1);
    let mut consumed: u64 = 0;

    for chunk in samples.chunks(window) {
        let level = super::energy_db(chunk);
        report.peak_db = Some(report.peak_db.map_or(level, |peak: f32| peak.max(level)));

        let window_start = clock.elapsed();
        consumed += chunk.len() as u64;
        clock.advance(offset(consumed, sample_rate).saturating_sub(window_start));

        let was_speaking = vad.is_speaking();
        if vad.process_buffer(chunk) && !was_speaking {
            report.speech_started_at = Some(window_start);
        }
        report.windows += 1;

        if vad.should_stop_recording() && vad.has_minimum_speech() {
            report.auto_stop_at = Some(clock.elapsed());
            break;
        }
    }

    report
}

/// Exact position of sample `index` in the stream
fn offset(index: u64, sample_rate: u32) -> Duration {
    let rate = u64::from(sample_rate);
    Duration::new(index / rate, ((index % rate) * 1_000_000_000 / rate) as u32)
}
