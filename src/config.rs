use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dialogue::{ScenarioScript, ScriptedResponder};
use crate::session::{FileSessionStore, OrchestratorConfig};
use crate::vad::VadConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioScript>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub sessions_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sessions_path: "sessions".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` (extension optional), then `LOQA_DIALOGUE__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LOQA_DIALOGUE").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.vad
            .validate()
            .with_context(|| format!("Invalid VAD settings in {}", path))?;

        Ok(cfg)
    }

    pub fn responder(&self) -> ScriptedResponder {
        ScriptedResponder::new(self.scenarios.iter().cloned())
    }

    pub fn session_store(&self) -> FileSessionStore {
        FileSessionStore::new(&self.storage.sessions_path)
    }
}
