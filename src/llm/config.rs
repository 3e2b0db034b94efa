//! Model endpoint configuration

use super::Sampling;
use crate::config::{env_parse, ConfigError};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8100/v1";
const DEFAULT_MODEL: &str = "default";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Configuration for the chat-completions endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Base URL up to and including the API version, e.g. `http://host:8100/v1`
    pub base_url: String,
    pub model: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub sampling: Sampling,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sampling: Sampling {
                max_tokens: None,
                temperature: Some(DEFAULT_TEMPERATURE),
            },
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(
                env_parse("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            sampling: Sampling {
                max_tokens: env_parse("LLM_MAX_TOKENS")?,
                temperature: Some(env_parse("LLM_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE)),
            },
        })
    }

    /// Full chat-completions endpoint URL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
