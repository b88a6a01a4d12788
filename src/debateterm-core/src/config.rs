//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::DebateError;
use crate::identity::BackendKind;
use crate::pacing::Pacing;
use crate::prompt::DEFAULT_CONTEXT_WINDOW;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pacing: Pacing,
    pub limits: LimitsConfig,
    pub backends: BackendsConfig,
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

/// Turn cap, prompt window and session retention.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_turns: u32,
    pub context_window: usize,
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_turns: 50,
            context_window: DEFAULT_CONTEXT_WINDOW,
            retention_secs: 60 * 60,
            sweep_interval_secs: 60 * 60,
        }
    }
}

impl LimitsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Endpoint settings for one upstream backend.
///
/// The API key itself never lives in the file; only the name of the
/// environment variable holding it.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub api_base: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl BackendConfig {
    fn new(api_base: &str, model: &str, api_key_env: &str) -> Self {
        Self {
            api_base: api_base.to_string(),
            model: model.to_string(),
            api_key_env: api_key_env.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for all backends.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub anthropic: BackendConfig,
    pub xai: BackendConfig,
    pub deepseek: BackendConfig,
    pub openai: BackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            anthropic: BackendConfig::new(
                "https://api.anthropic.com/v1",
                "claude-3-5-sonnet-20241022",
                "ANTHROPIC_API_KEY",
            ),
            xai: BackendConfig::new("https://api.x.ai/v1", "grok-2-1212", "GROK_API_KEY"),
            deepseek: BackendConfig::new(
                "https://api.deepseek.com/v1",
                "deepseek-chat",
                "DEEPSEEK_API_KEY",
            ),
            openai: BackendConfig::new("https://api.openai.com/v1", "gpt-4", "OPENAI_API_KEY"),
        }
    }
}

impl BackendsConfig {
    pub fn get(&self, kind: BackendKind) -> &BackendConfig {
        match kind {
            BackendKind::Anthropic => &self.anthropic,
            BackendKind::Xai => &self.xai,
            BackendKind::DeepSeek => &self.deepseek,
            BackendKind::OpenAi => &self.openai,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, DebateError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DebateError> {
        if self.limits.context_window == 0 {
            return Err(DebateError::ConfigError(
                "limits.context_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        pacing: Pacing::default(),
        limits: LimitsConfig::default(),
        backends: BackendsConfig::default(),
    }
}
