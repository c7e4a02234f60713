//! Speech service contracts
//!
//! Recognition and synthesis engines are opaque async services. The
//! orchestrator only depends on these traits; concrete engines are injected
//! when the orchestrator is built.

mod recognition;
mod synthesis;

pub use recognition::{Recognition, RecognitionError, Recognizer};
pub use synthesis::{SynthesisError, Synthesizer};
