//! Configuration management for Quipcast
//!
//! Values come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`$QUIPCAST_CONFIG` or
//!    `<config dir>/quipcast/config.toml`)
//! 3. Environment variables, including those loaded from a `.env` file
//!
//! Credentials are held as [`SecretString`] and never appear in `Debug`
//! output or logs.
//!
//! # Example file
//!
//! ```toml
//! [generator]
//! model = "gpt-4o-mini"
//! persona = "Cosmo Kramer"
//! temperature = 0.9
//!
//! [bluesky]
//! handle = "kramer.bsky.social"
//!
//! [history]
//! path = "~/.local/share/quipcast/recent_posts.json"
//! capacity = 100
//!
//! [schedule]
//! interval = "3h"
//! ```

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::quotes::{FallbackQuotes, DEFAULT_MAX_CHARS};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub bluesky: BlueskyConfig,
    pub twitter: TwitterConfig,
    pub history: HistoryConfig,
    pub schedule: ScheduleConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    /// Character the quotes are written in
    pub persona: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Longest quote accepted, in characters
    pub max_chars: usize,
    /// Generation attempts per tick before falling back
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            persona: "Cosmo Kramer".to_string(),
            temperature: 0.9,
            max_tokens: 150,
            max_chars: DEFAULT_MAX_CHARS,
            max_attempts: 10,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BlueskyConfig {
    pub enabled: bool,
    pub handle: Option<String>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub app_password: Option<SecretString>,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handle: None,
            app_password: None,
        }
    }
}

impl BlueskyConfig {
    /// Handle and app password are both present
    pub fn is_complete(&self) -> bool {
        self.handle.as_deref().is_some_and(|h| !h.trim().is_empty()) && self.app_password.is_some()
    }

    /// Some, but not all, credentials are present
    pub fn is_partial(&self) -> bool {
        !self.is_complete() && (self.handle.is_some() || self.app_password.is_some())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub enabled: bool,
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_secret: Option<SecretString>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub access_token: Option<SecretString>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub access_token_secret: Option<SecretString>,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_secret: None,
            access_token: None,
            access_token_secret: None,
        }
    }
}

impl TwitterConfig {
    fn present(&self) -> usize {
        [
            &self.api_key,
            &self.api_secret,
            &self.access_token,
            &self.access_token_secret,
        ]
        .iter()
        .filter(|s| s.is_some())
        .count()
    }

    /// All four OAuth 1.0a credentials are present
    pub fn is_complete(&self) -> bool {
        self.present() == 4
    }

    /// Some, but not all, credentials are present
    pub fn is_partial(&self) -> bool {
        (1..4).contains(&self.present())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: String,
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/quipcast/recent_posts.json".to_string(),
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl HistoryConfig {
    /// History file path with `~` expanded
    pub fn expand_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time between ticks, e.g. "1h", "3h", "90m"
    pub interval: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: "1h".to_string(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Result<Duration> {
        parse_interval(&self.interval)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Publish attempts per platform per tick
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Config {
    /// Load configuration from the default location and the environment
    ///
    /// A missing config file is not an error; credentials usually come from
    /// the environment alone.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], reading `path` instead of the default location
    /// when given. An explicit path must exist.
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let (config_path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (resolve_config_path()?, false),
        };
        let mut config = if explicit || config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path (no environment overrides)
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Override values from process environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override values using `lookup`; empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str| get(key).map(SecretString::from);

        if let Some(key) = secret("OPENAI_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.generator.base_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.generator.model = model;
        }
        if let Some(persona) = get("QUIPCAST_PERSONA") {
            self.generator.persona = persona;
        }

        if let Some(handle) = get("BLUESKY_HANDLE") {
            self.bluesky.handle = Some(handle);
        }
        if let Some(password) = secret("BLUESKY_APP_PASSWORD") {
            self.bluesky.app_password = Some(password);
        }

        if let Some(v) = secret("TWITTER_API_KEY") {
            self.twitter.api_key = Some(v);
        }
        if let Some(v) = secret("TWITTER_API_SECRET") {
            self.twitter.api_secret = Some(v);
        }
        if let Some(v) = secret("TWITTER_ACCESS_TOKEN") {
            self.twitter.access_token = Some(v);
        }
        if let Some(v) = secret("TWITTER_ACCESS_TOKEN_SECRET") {
            self.twitter.access_token_secret = Some(v);
        }

        if let Some(path) = get("QUIPCAST_HISTORY_PATH") {
            self.history.path = path;
        }
        if let Some(interval) = get("QUIPCAST_POST_INTERVAL") {
            self.schedule.interval = interval;
        }
    }

    /// Check value ranges; credentials are not required here
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(invalid("generator.temperature", "must be between 0.0 and 2.0").into());
        }
        if self.generator.max_chars == 0 {
            return Err(invalid("generator.max_chars", "must be at least 1").into());
        }
        if let Some(shortest) = FallbackQuotes::builtin().shortest_char_count() {
            if self.generator.max_chars < shortest {
                let reason = format!(
                    "must be at least {} so a fallback quote always fits",
                    shortest
                );
                return Err(invalid("generator.max_chars", &reason).into());
            }
        }
        if self.generator.max_tokens == 0 {
            return Err(invalid("generator.max_tokens", "must be at least 1").into());
        }
        if self.generator.max_attempts == 0 {
            return Err(invalid("generator.max_attempts", "must be at least 1").into());
        }
        if self.history.capacity == 0 {
            return Err(invalid("history.capacity", "must be at least 1").into());
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1").into());
        }
        self.schedule.interval()?;

        Ok(())
    }
}

/// Parse a human-readable interval such as "1h" or "3h 30m"
pub fn parse_interval(input: &str) -> Result<Duration> {
    let interval = humantime::parse_duration(input.trim()).map_err(|e| {
        ConfigError::InvalidValue {
            field: "schedule.interval".to_string(),
            reason: format!("'{}': {}", input, e),
        }
    })?;

    if interval.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: "schedule.interval".to_string(),
            reason: "must be greater than zero".to_string(),
        }
        .into());
    }

    Ok(interval)
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from))
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("QUIPCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("quipcast").join("config.toml"))
}
