//! Conversation model: states, legal transitions, scenarios and responses

mod responder;
mod scenario;
mod state;

pub use responder::{ResponseGenerator, ScenarioScript, ScriptedResponder};
pub use scenario::{Scenario, SessionContext};
pub use state::{transition, ConversationState, ErrorKind, Event, IllegalTransition, PermissionScope};
