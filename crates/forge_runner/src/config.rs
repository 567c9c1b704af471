//! Process configuration for dynamic-safety checks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Marker a Python interpreter prints when a script dies with an exception.
pub const PYTHON_TRACEBACK: &str = "Traceback (most recent call last)";

/// How the game process is launched and judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interpreter binary (default: `python3`)
    pub interpreter: String,
    /// Arguments placed before the entry point (e.g. `-u`)
    pub args: Vec<String>,
    /// Extra environment for the game process
    pub env: BTreeMap<String, String>,
    /// Any of these in stderr marks a still-running game as crashed
    pub crash_markers: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let mut env = BTreeMap::new();
        // Headless: no window, no audio device.
        env.insert("SDL_VIDEODRIVER".to_string(), "dummy".to_string());
        env.insert("SDL_AUDIODRIVER".to_string(), "dummy".to_string());
        env.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());

        Self {
            interpreter: "python3".to_string(),
            args: Vec::new(),
            env,
            crash_markers: vec![PYTHON_TRACEBACK.to_string()],
        }
    }
}

impl RunnerConfig {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn crash_marker(mut self, marker: impl Into<String>) -> Self {
        self.crash_markers.push(marker.into());
        self
    }

    /// True if `stderr` carries any configured crash marker.
    pub fn is_crash(&self, stderr: &str) -> bool {
        self.crash_markers.iter().any(|m| stderr.contains(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_headless_python() {
        let config = RunnerConfig::default();
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.env.get("SDL_VIDEODRIVER").map(String::as_str), Some("dummy"));
        assert!(config.is_crash("Traceback (most recent call last):\n  File \"main.py\""));
        assert!(!config.is_crash("Window created"));
    }

    #[test]
    fn test_builder() {
        let config = RunnerConfig::new("python3.12")
            .arg("-X")
            .arg("dev")
            .env("ARCADE_HEADLESS", "1")
            .crash_marker("Segmentation fault");

        assert_eq!(config.args, vec!["-X", "dev"]);
        assert!(config.is_crash("Segmentation fault (core dumped)"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RunnerConfig = toml::from_str("interpreter = \"/usr/bin/python3\"").unwrap();
        assert_eq!(config.interpreter, "/usr/bin/python3");
        assert_eq!(config.crash_markers, vec![PYTHON_TRACEBACK.to_string()]);
    }
}
