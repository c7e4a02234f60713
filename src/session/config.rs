use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How often the capture poll loop feeds the VAD and checks for auto-stop
    pub poll_interval_ms: u64,

    /// Sample rate requested from the capture backend
    pub sample_rate: u32,

    /// Capacity of the capture buffer channel
    pub buffer_capacity: usize,

    /// Speak the summary when a session completes
    pub speak_summary: bool,

    /// Move from ShowingSummary to Completed without waiting for `acknowledge_summary()`
    pub auto_acknowledge_summary: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            sample_rate: 16000,
            buffer_capacity: 64,
            speak_summary: true,
            auto_acknowledge_summary: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
