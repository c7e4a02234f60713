use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("speech synthesis unavailable: {0}")]
    Unavailable(String),
    #[error("playback interrupted")]
    Interrupted,
}

/// Text-to-speech engine with playback
///
/// `speak` resolves exactly once per call, after playback finishes. A new
/// call supersedes any playback still running: the earlier call resolves
/// (typically with `Interrupted`) instead of staying pending.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SynthesisError>;
}
