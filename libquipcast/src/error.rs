//! Error types for Quipcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuipcastError>;

#[derive(Error, Debug)]
pub enum QuipcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl QuipcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            QuipcastError::InvalidInput(_) => 3,
            QuipcastError::Config(_) => 2,
            QuipcastError::Generation(GenerationError::NotConfigured) => 2,
            QuipcastError::Generation(_) => 1,
            QuipcastError::Platform(_) => 1,
            QuipcastError::History(_) => 1,
            QuipcastError::Output(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("No platforms enabled: set BLUESKY_HANDLE/BLUESKY_APP_PASSWORD or the four TWITTER_* credentials")]
    NoPlatformsEnabled,
}

/// Failure to obtain a quote from the text-generation service.
///
/// Never fatal: the acceptance loop recovers by falling back to the
/// built-in quote set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("No generation API key configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Generation API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from generation API")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            GenerationError::Timeout(error.to_string())
        } else {
            GenerationError::Http(error.to_string())
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

impl PlatformError {
    /// Whether the same request may succeed if sent again after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::Network(_) | PlatformError::RateLimit(_))
    }
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to replace history file: {0}")]
    Persist(String),
}
