//! Configuration management for the handoff router.
//!
//! Configuration can be set via environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the chat-completions backend.
//! - `LLM_API_URL` - Optional. Base URL of an OpenAI-compatible API. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. Model used by the preset agents. Defaults to `gpt-4o-mini`.
//! - `MAX_TURNS` - Optional. Maximum backend turns per run. Defaults to `20`.
//! - `YOUTUBE_API_KEY` - Optional. YouTube Data API key for the video search agent.
//! - `SEARCH_REGION` - Optional. DuckDuckGo region code for web search. Defaults to `jp-jp`.
//! - `HTTP_TIMEOUT_SECS` - Optional. Timeout for backend and search requests. Defaults to `30`.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TURNS: usize = 20;
pub const DEFAULT_SEARCH_REGION: &str = "jp-jp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Router configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-completions API key
    pub api_key: String,

    /// Base URL of the chat-completions API
    pub api_url: String,

    /// Model identifier assigned to the preset agents
    pub default_model: String,

    /// Upper bound on backend turns per run
    pub max_turns: usize,

    /// YouTube Data API key (video search reports a failure without it)
    pub youtube_api_key: Option<String>,

    /// DuckDuckGo region code
    pub search_region: String,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let api_url = std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let max_turns = parse_env("MAX_TURNS", DEFAULT_MAX_TURNS)?;
        if max_turns == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_TURNS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let youtube_api_key = std::env::var("YOUTUBE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let search_region =
            std::env::var("SEARCH_REGION").unwrap_or_else(|_| DEFAULT_SEARCH_REGION.to_string());

        let http_timeout = Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 30u64)?);

        Ok(Self {
            api_key,
            api_url,
            default_model,
            max_turns,
            youtube_api_key,
            search_region,
            http_timeout,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            default_model,
            max_turns: DEFAULT_MAX_TURNS,
            youtube_api_key: None,
            search_region: DEFAULT_SEARCH_REGION.to_string(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = Config::new("key".to_string(), "test-model".to_string());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.max_turns, DEFAULT_MAX_TURNS);
        assert_eq!(config.search_region, "jp-jp");
        assert!(config.youtube_api_key.is_none());
    }

    #[test]
    fn parse_env_falls_back_to_default_when_unset() {
        let value: usize = parse_env("HANDOFF_ROUTER_TEST_UNSET_VAR", 7).expect("default");
        assert_eq!(value, 7);
    }
}
