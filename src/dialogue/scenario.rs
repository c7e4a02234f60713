use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A practice scenario the virtual interlocutor plays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,

    /// Number of user turns before the session wraps up
    pub max_turns: u32,
}

impl Scenario {
    pub fn new(id: impl Into<String>, title: impl Into<String>, max_turns: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            max_turns,
        }
    }
}

/// Per-session progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub scenario: Scenario,

    /// Completed user turns; never decreases within a session
    pub turn_number: u32,
}

impl SessionContext {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            scenario,
            turn_number: 0,
        }
    }

    pub fn max_turns(&self) -> u32 {
        self.scenario.max_turns
    }

    pub fn advance_turn(&mut self) -> u32 {
        self.turn_number += 1;
        self.turn_number
    }

    pub fn turn_limit_reached(&self) -> bool {
        self.turn_number >= self.max_turns()
    }
}
