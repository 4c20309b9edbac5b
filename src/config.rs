// src/config.rs
use crate::error::Result as EngineResult;
use crate::profile::{builtin_profiles, ExerciseProfile, ProfileRegistry};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Replaces the built-in exercise table when set.
    pub profiles: Option<Vec<ExerciseProfile>>,
    /// Registered in addition to the base table.
    pub extra_profiles: Vec<ExerciseProfile>,
    pub export_dir: PathBuf,
    /// Session used when a trace line names none.
    pub default_session: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profiles: None,
            extra_profiles: Vec::new(),
            export_dir: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("RepTracker")))
                .unwrap_or_else(|| PathBuf::from("./output")),
            default_session: "default".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads and validates a JSON configuration file. Missing fields take
    /// their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .build_registry()
            .with_context(|| format!("Invalid exercise profiles in {}", path.display()))?;

        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn build_registry(&self) -> EngineResult<ProfileRegistry> {
        let base = self.profiles.clone().unwrap_or_else(builtin_profiles);
        ProfileRegistry::from_profiles(base.into_iter().chain(self.extra_profiles.iter().cloned()))
    }
}
