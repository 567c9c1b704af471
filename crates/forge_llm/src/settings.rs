//! Provider credentials and defaults.
//!
//! Read from the `[llm]` section of `forge.toml`, then overlaid by the
//! environment. Keys are never written back out.

use forge_core::Provider;
use serde::{Deserialize, Serialize};

use crate::adapter::LlmAdapter;
use crate::error::{LlmError, LlmResult};

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

/// LLM settings for one run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    /// Model override applied to every provider
    pub model: Option<String>,
    pub temperature: f32,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
    pub ollama_base_url: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            temperature: default_temperature(),
            openai_api_key: None,
            anthropic_api_key: None,
            ollama_base_url: default_ollama_base_url(),
        }
    }
}

impl LlmSettings {
    /// Defaults overlaid by the process environment
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup (empty values are ignored)
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(key);
        }
        if let Some(url) = get("OLLAMA_BASE_URL") {
            self.ollama_base_url = url;
        }
        if let Some(model) = get("FORGE_LLM_MODEL") {
            self.model = Some(model);
        }
        if let Some(provider) = get("FORGE_LLM_PROVIDER").and_then(|p| p.parse().ok()) {
            self.provider = provider;
        }
    }

    /// Build an adapter for `provider`; an explicit `model` beats the configured one
    pub fn adapter_for(&self, provider: Provider, model: Option<&str>) -> LlmResult<LlmAdapter> {
        let model = model.map(str::to_string).or_else(|| self.model.clone());

        match provider {
            Provider::OpenAi => {
                let key = self
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| LlmError::NotConfigured(provider.to_string()))?;
                Ok(LlmAdapter::new(provider, key, model))
            }
            Provider::Anthropic => {
                let key = self
                    .anthropic_api_key
                    .clone()
                    .ok_or_else(|| LlmError::NotConfigured(provider.to_string()))?;
                Ok(LlmAdapter::new(provider, key, model))
            }
            Provider::Ollama => Ok(LlmAdapter::ollama(&self.ollama_base_url, model)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ChatModel;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let settings = LlmSettings::default();
        let err = settings.adapter_for(Provider::OpenAi, None).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }

    #[test]
    fn test_env_overlay() {
        let mut settings = LlmSettings::default();
        settings.apply_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("FORGE_LLM_MODEL", "claude-3-haiku"),
            ("OPENAI_API_KEY", "  "),
        ]));

        assert_eq!(settings.anthropic_api_key.as_deref(), Some("sk-ant"));
        assert!(settings.openai_api_key.is_none());

        let adapter = settings.adapter_for(Provider::Anthropic, None).unwrap();
        assert_eq!(adapter.model(), "claude-3-haiku");
    }

    #[test]
    fn test_explicit_model_wins() {
        let mut settings = LlmSettings::default();
        settings.model = Some("configured".to_string());
        let adapter = settings.adapter_for(Provider::Ollama, Some("qwen2.5")).unwrap();
        assert_eq!(adapter.model(), "qwen2.5");
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let settings = LlmSettings::default();
        let adapter = settings.adapter_for(Provider::Ollama, None).unwrap();
        assert_eq!(adapter.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_parses_toml_section() {
        let settings: LlmSettings = toml::from_str("provider = \"anthropic\"\ntemperature = 0.3\n").unwrap();
        assert_eq!(settings.provider, Provider::Anthropic);
        assert_eq!(settings.temperature, 0.3);
        assert_eq!(settings.ollama_base_url, "http://localhost:11434");
    }
}
