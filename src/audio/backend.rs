use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// One buffer of mono audio delivered by a capture backend
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since the stream started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Parameters the orchestrator asks a capture backend to honor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// Target sample rate (backends resample if needed)
    pub sample_rate: u32,
    /// Preferred number of samples per delivered buffer
    pub buffer_samples: usize,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            buffer_samples: 4096,
        }
    }
}

/// Identifies one running capture stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(Uuid);

impl StreamHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for StreamHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio captured during one recording turn, handed to recognition
#[derive(Debug, Clone)]
pub struct AudioHandle {
    pub id: Uuid,
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

impl AudioHandle {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sample_rate,
            samples: samples.into(),
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture stream is not running")]
    NotRunning,
    #[error("capture stream failed: {0}")]
    Stream(String),
}

/// Audio capture backend trait
///
/// Backends run their own capture thread or callback and push buffers into
/// the supplied sink. The sink is bounded; backends should use `try_send`
/// from real-time callbacks and drop buffers rather than block.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Ask the platform for microphone access
    async fn request_permission(&self) -> bool;

    /// Start capturing, delivering buffers to `sink`
    async fn start(
        &self,
        request: StreamRequest,
        sink: mpsc::Sender<AudioFrame>,
    ) -> Result<StreamHandle, CaptureError>;

    /// Stop the stream and hand back everything captured since `start`
    async fn stop(&self, stream: StreamHandle) -> Result<AudioHandle, CaptureError>;

    /// Tear the stream down without producing audio
    ///
    /// Called when a turn is abandoned (reset, cancelled stop). Must not block.
    fn abort(&self, stream: StreamHandle);

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// A running capture stream, released on every exit path
///
/// `finish()` is the normal release (stop + collect audio). Dropping the guard
/// without finishing aborts the stream.
pub struct ActiveCapture {
    backend: Arc<dyn CaptureBackend>,
    stream: Option<StreamHandle>,
}

impl ActiveCapture {
    pub async fn start(
        backend: Arc<dyn CaptureBackend>,
        request: StreamRequest,
        sink: mpsc::Sender<AudioFrame>,
    ) -> Result<Self, CaptureError> {
        let stream = backend.start(request, sink).await?;
        debug!("Capture stream {} started on {}", stream.id(), backend.name());

        Ok(Self {
            backend,
            stream: Some(stream),
        })
    }

    pub fn stream(&self) -> Option<StreamHandle> {
        self.stream
    }

    /// Stop the stream and collect the captured audio
    ///
    /// The handle stays owned until `stop` resolves, so dropping this future
    /// midway still aborts the stream.
    pub async fn finish(mut self) -> Result<AudioHandle, CaptureError> {
        let stream = self.stream.ok_or(CaptureError::NotRunning)?;
        debug!("Stopping capture stream {}", stream.id());

        let audio = self.backend.stop(stream).await;
        self.stream = None;
        audio
    }
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            warn!("Aborting unfinished capture stream {}", stream.id());
            self.backend.abort(stream);
        }
    }
}
