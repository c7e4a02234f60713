use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::config::VadConfig;
use crate::clock::{Clock, SystemClock};

/// Floor applied to RMS before taking the logarithm, so silence maps to -200 dB
const RMS_FLOOR: f32 = 1e-10;

/// RMS energy of a buffer in decibels relative to full scale
pub fn energy_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 20.0 * RMS_FLOOR.log10();
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_squares / samples.len() as f64).sqrt() as f32;

    20.0 * rms.max(RMS_FLOOR).log10()
}

/// Energy-threshold voice activity detector with hysteresis
///
/// Owned by a single logical context per recording turn. `reset()` must be
/// called before the first buffer of every turn.
pub struct VoiceActivityDetector {
    config: VadConfig,
    clock: Arc<dyn Clock>,
    last_speech_at: Option<Instant>,
    speech_started_at: Option<Instant>,
    is_speaking: bool,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: VadConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            last_speech_at: None,
            speech_started_at: None,
            is_speaking: false,
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// Analyze one buffer and return the current speaking state
    ///
    /// A quiet buffer never clears `is_speaking`; only the stop decision or
    /// `reset()` does.
    pub fn process_buffer(&mut self, samples: &[f32]) -> bool {
        let level = energy_db(samples);

        if level > self.config.energy_threshold_db {
            let now = self.clock.now();
            self.last_speech_at = Some(now);

            if !self.is_speaking {
                debug!("Speech onset at {:.1} dB", level);
                self.speech_started_at = Some(now);
                self.is_speaking = true;
            }
        }

        self.is_speaking
    }

    /// True once speech has been followed by enough trailing silence
    pub fn should_stop_recording(&self) -> bool {
        if !self.is_speaking {
            return false;
        }

        match self.last_speech_at {
            Some(last) => {
                self.clock.now().saturating_duration_since(last) >= self.config.silence_duration()
            }
            None => false,
        }
    }

    /// True once the current utterance spans at least the minimum duration
    ///
    /// Measured from onset to the most recent loud buffer, so trailing
    /// silence never stretches a short burst into a valid utterance.
    pub fn has_minimum_speech(&self) -> bool {
        match (self.speech_started_at, self.last_speech_at) {
            (Some(started), Some(last)) => {
                last.saturating_duration_since(started) >= self.config.minimum_speech_duration()
            }
            _ => false,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub fn reset(&mut self) {
        self.last_speech_at = None;
        self.speech_started_at = None;
        self.is_speaking = false;
    }
}
