//! Layered settings: `forge.toml`, then environment, then flags.

use std::path::{Path, PathBuf};

use forge_llm::LlmSettings;
use forge_pipeline::PipelineConfig;
use forge_rag::{RagConfig, RagError};
use forge_runner::RunnerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "forge.toml";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid knowledge base settings: {0}")]
    Rag(#[from] RagError),
}

/// Every section of `forge.toml`. Missing sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeSettings {
    pub llm: LlmSettings,
    pub rag: RagConfig,
    pub pipeline: PipelineConfig,
    pub runner: RunnerConfig,
}

impl ForgeSettings {
    /// Load the file (explicit path, or `forge.toml` if present) and
    /// overlay the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match explicit {
            Some(path) if !path.exists() => return Err(SettingsError::NotFound(path.to_path_buf())),
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_SETTINGS_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_lookup(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        debug!("Loading settings from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay environment variables from any source.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.llm.apply_lookup(&lookup);
        self.rag.apply_lookup(&lookup)?;
        self.pipeline.apply_lookup(&lookup);
        if let Some(python) = lookup("FORGE_PYTHON").filter(|v| !v.trim().is_empty()) {
            self.runner.interpreter = python;
        }
        Ok(())
    }
}
