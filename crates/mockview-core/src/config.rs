//! Root configuration schema.
//!
//! Loaded from `~/.config/mockview/config.toml` by the infrastructure layer;
//! every section and field has a default so a missing file yields a working
//! configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RootConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GuardConfig {
    /// Interval between duration-guard checks, in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl GuardConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

/// Which generation backend the server wires up.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    #[default]
    Claude,
    /// Deterministic canned generator; no network, no API key.
    Scripted,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout applied to the upstream HTTP call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Total attempts per generation call (first try included).
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Base delay of the exponential backoff between attempts.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// API key override; the ANTHROPIC_API_KEY environment variable wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            api_key: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8470".to_string()
}

fn default_tick_secs() -> u64 {
    1
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: RootConfig = toml::from_str("").unwrap();
        assert_eq!(config, RootConfig::default());
        assert_eq!(config.server.bind, "127.0.0.1:8470");
        assert_eq!(config.guard.tick_secs, 1);
        assert_eq!(config.generation.provider, GenerationProvider::Claude);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: RootConfig = toml::from_str(
            r#"
            [generation]
            provider = "scripted"
            retry_max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.provider, GenerationProvider::Scripted);
        assert_eq!(config.generation.retry_max_attempts, 5);
        assert_eq!(config.generation.model, "claude-sonnet-4-20250514");
        assert_eq!(config.server.bind, "127.0.0.1:8470");
    }

    #[test]
    fn test_guard_tick_floor() {
        let guard = GuardConfig { tick_secs: 0 };
        assert_eq!(guard.tick(), Duration::from_secs(1));
    }
}
