//! Practice session management
//!
//! This module provides the `TurnOrchestrator` that runs one spoken-dialogue
//! session at a time:
//! - Permission gating before a session starts
//! - Capture with VAD-driven auto-stop (or manual stop)
//! - Recognition, response generation and speech playback per turn
//! - Transcript collection, summary and hand-off to a session store
//! - Cancellation of in-flight work on reset

mod config;
mod error;
mod orchestrator;
mod stats;
mod store;
mod transcript;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use orchestrator::{OrchestratorBuilder, StateChange, TurnOrchestrator};
pub use stats::SessionSummary;
pub use store::{FileSessionStore, SessionRecord, SessionStore};
pub use transcript::{Speaker, Transcript, TurnRecord};
