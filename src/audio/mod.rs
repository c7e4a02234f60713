pub mod backend;
pub mod file;

pub use backend::{
    ActiveCapture, AudioFrame, AudioHandle, CaptureBackend, CaptureError, StreamHandle,
    StreamRequest,
};
pub use file::AudioFile;
