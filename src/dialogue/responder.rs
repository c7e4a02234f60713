use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::scenario::Scenario;
use crate::session::TurnRecord;

const FALLBACK_OPENING: &str = "Hello! Let's practice. Go ahead whenever you're ready.";
const FALLBACK_REPLY: &str = "I see. Could you tell me a bit more?";

/// Produces the interlocutor's lines
#[async_trait::async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// The line spoken when a session starts
    fn initial_prompt(&self, scenario: &Scenario) -> String;

    /// Reply to the user's latest turn
    async fn respond(
        &self,
        scenario: &Scenario,
        user_text: &str,
        turn_number: u32,
        history: &[TurnRecord],
    ) -> String;

    /// Whether the session should wrap up after `turn_number` user turns
    fn is_session_over(&self, scenario: &Scenario, turn_number: u32) -> bool {
        turn_number >= scenario.max_turns
    }
}

/// Scripted content for one scenario, as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScript {
    pub id: String,
    pub title: String,
    pub max_turns: u32,
    pub opening: String,

    /// Replies cycled by turn number; `{user}` is replaced with the user's words
    #[serde(default)]
    pub replies: Vec<String>,

    /// Appended to the reply that finishes the session
    #[serde(default)]
    pub closing: Option<String>,

    /// Wrap up with the closing line after this many turns, before `max_turns`
    #[serde(default)]
    pub wrap_up_after: Option<u32>,
}

impl ScenarioScript {
    pub fn scenario(&self) -> Scenario {
        Scenario::new(self.id.clone(), self.title.clone(), self.max_turns)
    }
}

/// Template-driven responder backed by `ScenarioScript`s
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponder {
    scripts: HashMap<String, ScenarioScript>,
}

impl ScriptedResponder {
    pub fn new(scripts: impl IntoIterator<Item = ScenarioScript>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|script| (script.id.clone(), script))
                .collect(),
        }
    }

    pub fn script(&self, scenario_id: &str) -> Option<&ScenarioScript> {
        self.scripts.get(scenario_id)
    }

    pub fn scenarios(&self) -> Vec<Scenario> {
        let mut scenarios: Vec<Scenario> =
            self.scripts.values().map(ScenarioScript::scenario).collect();
        scenarios.sort_by(|a, b| a.id.cmp(&b.id));
        scenarios
    }
}

#[async_trait::async_trait]
impl ResponseGenerator for ScriptedResponder {
    fn initial_prompt(&self, scenario: &Scenario) -> String {
        self.script(&scenario.id)
            .map(|script| script.opening.clone())
            .unwrap_or_else(|| FALLBACK_OPENING.to_string())
    }

    async fn respond(
        &self,
        scenario: &Scenario,
        user_text: &str,
        turn_number: u32,
        _history: &[TurnRecord],
    ) -> String {
        let Some(script) = self.script(&scenario.id) else {
            return FALLBACK_REPLY.to_string();
        };

        let template = if script.replies.is_empty() {
            FALLBACK_REPLY
        } else {
            let index = turn_number.saturating_sub(1) as usize % script.replies.len();
            script.replies[index].as_str()
        };

        let mut reply = template.replace("{user}", user_text.trim());

        if self.is_session_over(scenario, turn_number) {
            if let Some(closing) = &script.closing {
                reply.push(' ');
                reply.push_str(closing);
            }
        }

        reply
    }

    fn is_session_over(&self, scenario: &Scenario, turn_number: u32) -> bool {
        let limit = self
            .script(&scenario.id)
            .and_then(|script| script.wrap_up_after)
            .unwrap_or(scenario.max_turns);

        turn_number >= limit.min(scenario.max_turns)
    }
}
