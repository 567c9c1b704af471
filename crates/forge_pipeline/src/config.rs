//! Pipeline settings.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::healing::HealingConfig;
use crate::production::{ProductionMode, DEFAULT_CONSOLIDATED_FILE};

/// Which production variant a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// One implementation call per planned file
    #[default]
    Multi,
    /// The whole plan implemented as a single file
    Single,
}

impl fmt::Display for ModeSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multi => f.write_str("multi"),
            Self::Single => f.write_str("single"),
        }
    }
}

impl FromStr for ModeSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multi" | "multi-file" => Ok(Self::Multi),
            "single" | "consolidated" => Ok(Self::Single),
            other => Err(format!("Unknown production mode: {}", other)),
        }
    }
}

/// `[pipeline]` section of `forge.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parent directory for run directories
    pub output_dir: PathBuf,
    pub mode: ModeSetting,
    /// File name used in single-file mode
    pub consolidated_filename: String,
    pub entry_point: String,
    pub logic_file: String,
    /// Dynamic-safety checks per run
    pub max_fix_attempts: u32,
    pub fuzz_duration_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_games"),
            mode: ModeSetting::Multi,
            consolidated_filename: DEFAULT_CONSOLIDATED_FILE.to_string(),
            entry_point: "main.py".to_string(),
            logic_file: "logic.py".to_string(),
            max_fix_attempts: 3,
            fuzz_duration_secs: 5,
        }
    }
}

impl PipelineConfig {
    /// Apply `FORGE_OUTPUT_DIR` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable source. Empty values are ignored.
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("FORGE_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn production_mode(&self) -> ProductionMode {
        match self.mode {
            ModeSetting::Multi => ProductionMode::MultiFile,
            ModeSetting::Single => ProductionMode::Consolidated {
                filename: self.consolidated_filename.clone(),
            },
        }
    }

    /// Healing settings for the configured mode.
    ///
    /// In single-file mode the consolidated file is the entry point.
    pub fn healing_config(&self) -> HealingConfig {
        let entry_point = match self.mode {
            ModeSetting::Multi => self.entry_point.clone(),
            ModeSetting::Single => self.consolidated_filename.clone(),
        };
        HealingConfig {
            entry_point,
            logic_file: self.logic_file.clone(),
            max_attempts: self.max_fix_attempts,
            fuzz_duration: Duration::from_secs(self.fuzz_duration_secs),
        }
    }
}
