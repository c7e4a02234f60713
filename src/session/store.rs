use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::stats::SessionSummary;
use super::transcript::Transcript;

/// Receives finished sessions
///
/// Fire-and-forget: implementations handle their own failures.
pub trait SessionStore: Send + Sync {
    fn save(&self, transcript: &Transcript, summary: &SessionSummary);
}

/// What a stored session file contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub transcript: Transcript,
    pub summary: SessionSummary,
}

/// Writes each session to `<dir>/<scenario>-<session_id>.json`
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_record(&self, transcript: &Transcript, summary: &SessionSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create sessions directory: {:?}", self.dir))?;

        let path = self.dir.join(format!(
            "{}-{}.json",
            summary.scenario_id,
            transcript.session_id()
        ));

        let record = SessionRecord {
            transcript: transcript.clone(),
            summary: summary.clone(),
        };

        let json = serde_json::to_vec_pretty(&record)?;
        fs::write(&path, json).with_context(|| format!("Failed to write session file: {:?}", path))?;

        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<SessionRecord> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read session file: {:?}", path))?;
        serde_json::from_slice(&bytes).context("Failed to parse session file")
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, transcript: &Transcript, summary: &SessionSummary) {
        match self.write_record(transcript, summary) {
            Ok(path) => info!("Session saved to {}", path.display()),
            Err(e) => warn!("Failed to save session {}: {:#}", transcript.session_id(), e),
        }
    }
}
