//! Bluesky platform implementation

use async_trait::async_trait;
use bsky_sdk::BskyAgent;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

/// Bluesky counts post length in graphemes; characters are a close,
/// conservative stand-in.
pub const BLUESKY_CHARACTER_LIMIT: usize = 300;

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Map Bluesky/AT Protocol errors to PlatformError
///
/// bsky-sdk surfaces XRPC failures as opaque error values, so the
/// classification works on the rendered message: HTTP status codes and AT
/// Protocol error names both appear there.
///
/// # Arguments
///
/// * `error` - The error from bsky-sdk (generic over error types)
/// * `context` - The operation context (e.g., "authentication", "posting")
fn map_bluesky_error<E: std::fmt::Display + std::fmt::Debug>(
    error: E,
    context: &str,
) -> PlatformError {
    let message = error.to_string();
    let detail = format!("{} {:?}", message, error);
    let lowered = detail.to_lowercase();

    if contains_any(&detail, &["429", "RateLimitExceeded", "TooManyRequests"]) {
        return PlatformError::RateLimit(format!(
            "Bluesky rate limit exceeded during {}: {}",
            context, message
        ));
    }

    if contains_any(
        &detail,
        &[
            "401",
            "403",
            "AuthenticationRequired",
            "InvalidToken",
            "ExpiredToken",
            "Unauthorized",
            "Forbidden",
            "AccountTakedown",
        ],
    ) {
        return PlatformError::Authentication(format!(
            "Bluesky authentication failed during {}: {}. Check BLUESKY_HANDLE and BLUESKY_APP_PASSWORD.",
            context, message
        ));
    }

    if contains_any(&detail, &["InvalidCredentials", "AccountNotFound"])
        || (context == "authentication" && lowered.contains("invalid"))
    {
        return PlatformError::Authentication(format!(
            "Invalid Bluesky credentials: {}. Check the handle and app password.",
            message
        ));
    }

    if contains_any(
        &detail,
        &["400", "InvalidRequest", "InvalidRecord", "ValidationError", "BadRequest"],
    ) {
        return PlatformError::Validation(format!(
            "Bluesky rejected the request during {}: {}",
            context, message
        ));
    }

    if contains_any(
        &lowered,
        &[
            "connect",
            "network",
            "timeout",
            "timed out",
            "unreachable",
            "dns",
            "502",
            "503",
            "504",
        ],
    ) {
        return PlatformError::Network(format!(
            "Network error while reaching Bluesky during {}: {}",
            context, message
        ));
    }

    PlatformError::Posting(format!(
        "Bluesky operation failed during {}: {}",
        context, message
    ))
}

pub struct BlueskyClient {
    agent: BskyAgent,
    handle: String,
    app_password: SecretString,
    authenticated: bool,
}

impl BlueskyClient {
    /// Create a new Bluesky client
    ///
    /// No network traffic happens until [`Platform::authenticate`].
    ///
    /// # Arguments
    ///
    /// * `handle` - The Bluesky handle (e.g., "kramer.bsky.social")
    /// * `app_password` - An app password, not the account password
    pub async fn new(handle: String, app_password: SecretString) -> Result<Self> {
        let agent = BskyAgent::builder()
            .build()
            .await
            .map_err(|e| PlatformError::Posting(format!("Failed to create Bluesky agent: {}", e)))?;

        Ok(Self {
            agent,
            handle,
            app_password,
            authenticated: false,
        })
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

#[async_trait]
impl Platform for BlueskyClient {
    async fn authenticate(&mut self) -> Result<()> {
        tracing::debug!("Creating Bluesky session for handle: {}", self.handle);

        self.agent
            .login(&self.handle, self.app_password.expose_secret())
            .await
            .map_err(|e| map_bluesky_error(e, "authentication"))?;

        self.authenticated = true;
        tracing::info!("Logged in to Bluesky as {}", self.handle);

        Ok(())
    }

    async fn post(&self, content: &str) -> Result<String> {
        use bsky_sdk::api::app::bsky::feed::post::RecordData;
        use bsky_sdk::api::types::string::Datetime;

        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        tracing::debug!("Posting to Bluesky: {} characters", content.chars().count());

        let record = RecordData {
            created_at: Datetime::now(),
            embed: None,
            entities: None,
            facets: None,
            labels: None,
            langs: None,
            reply: None,
            tags: None,
            text: content.to_string(),
        };

        let response = self
            .agent
            .create_record(record)
            .await
            .map_err(|e| map_bluesky_error(e, "posting"))?;

        let at_uri = response.uri.to_string();
        tracing::debug!("Posted to Bluesky: {}", at_uri);

        Ok(at_uri)
    }

    fn name(&self) -> &str {
        "bluesky"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(BLUESKY_CHARACTER_LIMIT)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
