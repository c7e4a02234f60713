use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    System,
}

/// One utterance in the transcript; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    speaker: Speaker,
    text: String,
    created_at: DateTime<Utc>,
    audio_reference: Option<Uuid>,
    confidence: Option<f32>,
}

impl TurnRecord {
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Captured audio this record was transcribed from
    pub fn audio_reference(&self) -> Option<Uuid> {
        self.audio_reference
    }

    /// Recognition confidence (0.0 to 1.0), user turns only
    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }
}

/// Append-only, strictly time-ordered record of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    entries: Vec<TurnRecord>,
}

impl Transcript {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            ended_at: None,
            entries: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn entries(&self) -> &[TurnRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn user_turns(&self) -> impl Iterator<Item = &TurnRecord> {
        self.entries.iter().filter(|r| r.speaker == Speaker::User)
    }

    pub fn append_user(
        &mut self,
        text: impl Into<String>,
        confidence: f32,
        audio_reference: Option<Uuid>,
    ) -> &TurnRecord {
        self.push(
            Speaker::User,
            text.into(),
            Some(confidence.clamp(0.0, 1.0)),
            audio_reference,
        )
    }

    pub fn append_system(&mut self, text: impl Into<String>) -> &TurnRecord {
        self.push(Speaker::System, text.into(), None, None)
    }

    /// Mark the session finished; only the first call has an effect
    pub fn finish(&mut self) -> bool {
        if self.ended_at.is_some() {
            return false;
        }
        self.ended_at = Some(self.next_timestamp());
        true
    }

    /// Elapsed time from start to end (or to now while still running)
    pub fn duration(&self) -> Duration {
        self.ended_at.unwrap_or_else(Utc::now) - self.started_at
    }

    fn push(
        &mut self,
        speaker: Speaker,
        text: String,
        confidence: Option<f32>,
        audio_reference: Option<Uuid>,
    ) -> &TurnRecord {
        let created_at = self.next_timestamp();
        self.entries.push(TurnRecord {
            speaker,
            text,
            created_at,
            audio_reference,
            confidence,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Wall-clock now, nudged past the previous entry so ordering is strict
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let floor = self
            .entries
            .last()
            .map(|r| r.created_at)
            .unwrap_or(self.started_at);

        if now > floor {
            now
        } else {
            floor + Duration::microseconds(1)
        }
    }
}
