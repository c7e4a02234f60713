use serde::{Deserialize, Serialize};

use super::transcript::Transcript;
use crate::dialogue::SessionContext;

/// Metrics shown when a session wraps up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub scenario_id: String,
    pub scenario_title: String,

    /// Completed user turns
    pub turns: u32,

    /// Words spoken by the user across all turns
    pub user_word_count: usize,

    /// Mean recognition confidence over user turns, if any
    pub average_confidence: Option<f32>,

    /// Session length in seconds
    pub duration_secs: f64,
}

impl SessionSummary {
    pub fn from_transcript(context: &SessionContext, transcript: &Transcript) -> Self {
        let confidences: Vec<f32> = transcript
            .user_turns()
            .filter_map(|r| r.confidence())
            .collect();

        let average_confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        };

        Self {
            scenario_id: context.scenario.id.clone(),
            scenario_title: context.scenario.title.clone(),
            turns: context.turn_number,
            user_word_count: transcript
                .user_turns()
                .map(|r| r.text().split_whitespace().count())
                .sum(),
            average_confidence,
            duration_secs: transcript.duration().num_milliseconds() as f64 / 1000.0,
        }
    }

    /// Short spoken wrap-up
    pub fn summary_text(&self) -> String {
        let turns = if self.turns == 1 { "turn" } else { "turns" };
        let mut text = format!(
            "Great practice! You completed {} {} and spoke {} words.",
            self.turns, turns, self.user_word_count
        );

        if let Some(confidence) = self.average_confidence {
            text.push_str(&format!(
                " Your speech was recognized with {:.0} percent clarity.",
                confidence * 100.0
            ));
        }

        text
    }
}
