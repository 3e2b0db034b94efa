//! Environment configuration

use crate::conversation::{RetentionPolicy, DEFAULT_MAX_HISTORY_MESSAGES};
use crate::extract::ToolCallPrecedence;
use crate::llm::LlmConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TOOL_SERVER_URL: &str = "http://localhost:8001";
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HEARING_SOCKET: &str = "/tmp/reachy_sockets/hearing.sock";
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Read and parse an optional environment variable
pub(crate) fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

/// Engine settings for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Completion requests allowed per turn
    pub max_iterations: u32,
    pub retention: RetentionPolicy,
    pub precedence: ToolCallPrecedence,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            retention: RetentionPolicy::default(),
            precedence: ToolCallPrecedence::default(),
        }
    }
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    pub tool_server_url: String,
    pub tool_timeout: Duration,
    /// Load tools from this repository instead of the tool server
    pub tools_repository: Option<PathBuf>,
    pub system_prompt_path: Option<PathBuf>,
    pub hearing_socket: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_iterations =
            env_parse::<u32>("MAX_TOOL_ITERATIONS")?.unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_TOOL_ITERATIONS",
                value: "0".to_string(),
            });
        }

        let retention = match std::env::var("HISTORY_POLICY").ok().as_deref().map(str::trim) {
            None | Some("" | "bounded") => RetentionPolicy::BoundedHistory {
                max_messages: env_parse("HISTORY_MAX_MESSAGES")?
                    .unwrap_or(DEFAULT_MAX_HISTORY_MESSAGES),
            },
            Some("summary") => RetentionPolicy::SummaryAugmented,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "HISTORY_POLICY",
                    value: other.to_string(),
                })
            }
        };

        let precedence = match std::env::var("TOOL_CALL_PRECEDENCE")
            .ok()
            .as_deref()
            .map(str::trim)
        {
            None | Some("" | "native") => ToolCallPrecedence::NativeFirst,
            Some("merge") => ToolCallPrecedence::Merge,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "TOOL_CALL_PRECEDENCE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            llm: LlmConfig::from_env()?,
            engine: EngineConfig {
                max_iterations,
                retention,
                precedence,
            },
            tool_server_url: std::env::var("TOOL_SERVER_URL")
                .unwrap_or_else(|_| DEFAULT_TOOL_SERVER_URL.to_string()),
            tool_timeout: Duration::from_secs(
                env_parse("TOOL_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
            ),
            tools_repository: std::env::var("TOOLS_REPOSITORY_PATH").ok().map(PathBuf::from),
            system_prompt_path: std::env::var("SYSTEM_PROMPT_PATH").ok().map(PathBuf::from),
            hearing_socket: std::env::var("HEARING_SOCKET_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_HEARING_SOCKET), PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_missing_and_blank() {
        assert_eq!(env_parse::<u32>("ROBOT_DIALOGUE_TEST_UNSET").unwrap(), None);

        std::env::set_var("ROBOT_DIALOGUE_TEST_BLANK", "  ");
        assert_eq!(env_parse::<u32>("ROBOT_DIALOGUE_TEST_BLANK").unwrap(), None);
    }

    #[test]
    fn test_env_parse_values() {
        std::env::set_var("ROBOT_DIALOGUE_TEST_NUMBER", " 42 ");
        assert_eq!(env_parse::<u32>("ROBOT_DIALOGUE_TEST_NUMBER").unwrap(), Some(42));

        std::env::set_var("ROBOT_DIALOGUE_TEST_BAD", "lots");
        let err = env_parse::<u32>("ROBOT_DIALOGUE_TEST_BAD").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Invalid value for ROBOT_DIALOGUE_TEST_BAD: "lots""#
        );
    }

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(
            config.retention,
            RetentionPolicy::BoundedHistory {
                max_messages: DEFAULT_MAX_HISTORY_MESSAGES
            }
        );
        assert_eq!(config.precedence, ToolCallPrecedence::NativeFirst);
    }
}
