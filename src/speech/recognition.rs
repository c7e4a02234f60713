use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioHandle;

/// Transcription of one user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,

    /// Engine confidence (0.0 to 1.0)
    pub confidence: f32,
}

impl Recognition {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("speech recognition permission denied")]
    PermissionDenied,
    #[error("no speech detected")]
    NoSpeech,
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),
    #[error("transcription failed: {0}")]
    Failed(String),
}

/// Speech-to-text engine
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Ask the platform for speech recognition access
    async fn request_permission(&self) -> bool;

    /// Transcribe one captured turn
    async fn transcribe(&self, audio: AudioHandle) -> Result<Recognition, RecognitionError>;
}
