pub mod audio;
pub mod clock;
pub mod config;
pub mod dialogue;
pub mod session;
pub mod speech;
pub mod vad;

pub use audio::{
    ActiveCapture, AudioFile, AudioFrame, AudioHandle, CaptureBackend, CaptureError, StreamHandle,
    StreamRequest,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use dialogue::{
    transition, ConversationState, ErrorKind, Event, IllegalTransition, PermissionScope,
    ResponseGenerator, Scenario, ScenarioScript, ScriptedResponder, SessionContext,
};
pub use session::{
    FileSessionStore, OrchestratorConfig, OrchestratorError, SessionStore, SessionSummary,
    Speaker, StateChange, Transcript, TurnOrchestrator, TurnRecord,
};
pub use speech::{Recognition, RecognitionError, Recognizer, SynthesisError, Synthesizer};
pub use vad::{scan_samples, ScanReport, VadConfig, VoiceActivityDetector};
