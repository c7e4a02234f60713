use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_SILENCE_SECS: f32 = 2.0;
const DEFAULT_MINIMUM_SPEECH_SECS: f32 = 0.5;

/// Tuning for the energy-threshold detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Buffers louder than this (dBFS) count as speech
    pub energy_threshold_db: f32,

    /// Trailing silence after speech before recording auto-stops
    pub silence_duration_secs: f32,

    /// Utterances shorter than this are treated as taps or noise bursts
    pub minimum_speech_duration_secs: f32,

    /// Preferred capture buffer size, also the window used by offline scans
    pub analysis_window_samples: usize,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold_db: -35.0,
            silence_duration_secs: DEFAULT_SILENCE_SECS,
            minimum_speech_duration_secs: DEFAULT_MINIMUM_SPEECH_SECS,
            analysis_window_samples: 4096,
        }
    }
}

impl VadConfig {
    /// Reject settings the detector cannot turn into timers
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("energy_threshold_db", self.energy_threshold_db),
            ("silence_duration_secs", self.silence_duration_secs),
            ("minimum_speech_duration_secs", self.minimum_speech_duration_secs),
        ] {
            if !value.is_finite() {
                anyhow::bail!("vad.{} must be a finite number, got {}", name, value);
            }
        }

        if self.silence_duration_secs < 0.0 || self.minimum_speech_duration_secs < 0.0 {
            anyhow::bail!("vad durations must not be negative");
        }

        Ok(())
    }

    pub fn silence_duration(&self) -> Duration {
        seconds(self.silence_duration_secs, DEFAULT_SILENCE_SECS)
    }

    pub fn minimum_speech_duration(&self) -> Duration {
        seconds(self.minimum_speech_duration_secs, DEFAULT_MINIMUM_SPEECH_SECS)
    }
}

/// Negative and NaN clamp to zero; values too large for a `Duration` use the default
fn seconds(value: f32, default: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0))
        .unwrap_or_else(|_| Duration::from_secs_f32(default))
}
