use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::scenario::Scenario;
use crate::session::SessionSummary;

/// Which permission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PermissionScope {
    Capture,
    Recognition,
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionScope::Capture => write!(f, "microphone"),
            PermissionScope::Recognition => write!(f, "speech recognition"),
        }
    }
}

/// Why a session entered the error state
///
/// The `Display` output is the human-readable reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum ErrorKind {
    #[error("{0} permission denied")]
    PermissionDenied(PermissionScope),
    #[error("audio capture failed: {0}")]
    CaptureFailed(String),
    #[error("speech recognition failed: {0}")]
    RecognitionFailed(String),
    #[error("speech synthesis unavailable: {0}")]
    SynthesisUnavailable(String),
}

/// The single active state of a conversation
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationState {
    Idle,
    Ready(Scenario),
    Recording,
    Transcribing,
    ProcessingIntent,
    GeneratingResponse,
    Speaking(String),
    WaitingForUser,
    ShowingSummary(SessionSummary),
    Error(ErrorKind),
    Completed,
}

impl ConversationState {
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "Idle",
            ConversationState::Ready(_) => "Ready",
            ConversationState::Recording => "Recording",
            ConversationState::Transcribing => "Transcribing",
            ConversationState::ProcessingIntent => "ProcessingIntent",
            ConversationState::GeneratingResponse => "GeneratingResponse",
            ConversationState::Speaking(_) => "Speaking",
            ConversationState::WaitingForUser => "WaitingForUser",
            ConversationState::ShowingSummary(_) => "ShowingSummary",
            ConversationState::Error(_) => "Error",
            ConversationState::Completed => "Completed",
        }
    }

    /// Terminal states make no autonomous progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationState::Error(_) | ConversationState::Completed)
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationState::Error(kind) => write!(f, "Error({})", kind),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartSession(Scenario),
    /// The opening line starts playing
    InitialPromptStarted(String),
    UserBeginsTurn,
    /// Manual and automatic stops are the same event
    CaptureStopped,
    RecognitionSucceeded { text: String, confidence: f32 },
    TurnLimitReached(SessionSummary),
    TurnLimitNotReached,
    ResponseReady(String),
    /// `summary` is set when the session is complete after this playback
    PlaybackFinished { summary: Option<SessionSummary> },
    SummaryAcknowledged,
    Failed(ErrorKind),
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StartSession(_) => "startSession",
            Event::InitialPromptStarted(_) => "initialPromptStarted",
            Event::UserBeginsTurn => "userBeginsTurn",
            Event::CaptureStopped => "captureStopped",
            Event::RecognitionSucceeded { .. } => "recognitionSucceeded",
            Event::TurnLimitReached(_) => "turnLimitReached",
            Event::TurnLimitNotReached => "turnLimitNotReached",
            Event::ResponseReady(_) => "responseReady",
            Event::PlaybackFinished { .. } => "playbackFinished",
            Event::SummaryAcknowledged => "summaryAcknowledged",
            Event::Failed(_) => "failed",
            Event::Reset => "reset",
        }
    }
}

/// An event that is not legal in the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition: {event} in state {from}")]
pub struct IllegalTransition {
    pub from: &'static str,
    pub event: &'static str,
}

/// Apply `event` to `current`
///
/// Every (state, event) pair outside the transition table is rejected; no
/// pair is silently ignored.
pub fn transition(
    current: &ConversationState,
    event: Event,
) -> Result<ConversationState, IllegalTransition> {
    use ConversationState as S;

    let next = match (current, event) {
        (S::Idle | S::Completed, Event::StartSession(scenario)) => S::Ready(scenario),
        (S::Ready(_), Event::InitialPromptStarted(text)) => S::Speaking(text),
        (S::WaitingForUser, Event::UserBeginsTurn) => S::Recording,
        (S::Recording, Event::CaptureStopped) => S::Transcribing,
        (S::Transcribing, Event::RecognitionSucceeded { .. }) => S::ProcessingIntent,
        (S::ProcessingIntent, Event::TurnLimitReached(summary)) => S::ShowingSummary(summary),
        (S::ProcessingIntent, Event::TurnLimitNotReached) => S::GeneratingResponse,
        (S::GeneratingResponse, Event::ResponseReady(text)) => S::Speaking(text),
        (S::Speaking(_), Event::PlaybackFinished { summary: None }) => S::WaitingForUser,
        (S::Speaking(_), Event::PlaybackFinished { summary: Some(summary) }) => {
            S::ShowingSummary(summary)
        }
        (S::ShowingSummary(_), Event::SummaryAcknowledged) => S::Completed,
        (state, Event::Failed(kind)) if !state.is_terminal() => S::Error(kind),
        (S::Error(_), Event::Reset) => S::Idle,
        (state, event) => {
            return Err(IllegalTransition {
                from: state.name(),
                event: event.name(),
            })
        }
    };

    Ok(next)
}
