//! `casegate.toml`: coordinator limits and LLM backend selection.
//!
//! ```toml
//! [coordinator]
//! max_attempts = 3
//! top_k = 3
//! use_retrieval = true
//!
//! [llm]
//! provider = "openai-compatible"
//! model = "llama-3.3-70b-versatile"
//! api_key_env = "GROQ_API_KEY"
//! ```
//!
//! API keys are never read from the file, only from the named variable.

use std::path::Path;

use casegate_eval::CoordinatorConfig;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CONFIG_FILE: &str = "casegate.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub coordinator: CoordinatorConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum LlmProvider {
    #[default]
    Anthropic,
    OpenaiCompatible,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LlmConfig {
    pub provider: LlmProvider,
    /// Defaults per provider when absent.
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
}

impl LlmConfig {
    pub fn model(&self) -> String {
        match (&self.model, self.provider) {
            (Some(m), _) => m.clone(),
            (None, LlmProvider::Anthropic) => "claude-sonnet-4-20250514".to_string(),
            (None, LlmProvider::OpenaiCompatible) => "llama-3.3-70b-versatile".to_string(),
        }
    }
}

/// Read the config file.
///
/// An explicit `path` must exist. Without one, `casegate.toml` in the
/// working directory is used if present, otherwise defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let path = match path {
        Some(p) => p,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| format!("could not parse '{}': {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), ?config, "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.coordinator, CoordinatorConfig::default());
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [coordinator]
            max_attempts = 5

            [llm]
            provider = "openai-compatible"
            api_key_env = "MY_KEY"
            "#,
        )
        .unwrap();
        assert_eq!(config.coordinator.max_attempts, 5);
        assert_eq!(config.coordinator.top_k, 3);
        assert_eq!(config.llm.provider, LlmProvider::OpenaiCompatible);
        assert_eq!(config.llm.model(), "llama-3.3-70b-versatile");
        assert_eq!(config.llm.api_key_env.as_deref(), Some("MY_KEY"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = toml::from_str::<Config>("[llm]\napi_key = \"sk-oops\"\n").unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn coordinator_typos_are_rejected() {
        let err = toml::from_str::<Config>("[coordinator]\nmax_attempt = 5\n").unwrap_err();
        assert!(err.to_string().contains("max_attempt"));

        let config = toml::from_str::<Config>("[coordinator]\nmax_attempts = 5\n").unwrap();
        assert_eq!(config.coordinator.max_attempts, 5);
        assert_eq!(config.coordinator.top_k, 3);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.starts_with("could not read"));
    }
}
