//! Multi-platform publishing
//!
//! Posts one quote to every configured platform concurrently. Each platform
//! is independent: it is authenticated on demand, validated against its own
//! character limit, and retried in place on transient failures. One
//! platform failing never stops the others.

use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, RetryConfig};
use crate::error::{ConfigError, QuipcastError, Result};
use crate::platforms::{
    bluesky::BlueskyClient,
    twitter::{TwitterClient, TwitterCredentials},
    Platform,
};
use crate::quotes::Quote;

/// Result of publishing to a single platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    /// Platform name (e.g., "bluesky", "twitter")
    pub platform: String,
    pub success: bool,
    /// Platform-specific post ID (AT URI or tweet ID) on success
    pub platform_post_id: Option<String>,
    /// Error message on failure
    pub error: Option<String>,
    /// `post` calls made; zero when authentication or validation failed
    pub attempts: u32,
}

impl PublishResult {
    fn failed(platform: String, error: &QuipcastError, attempts: u32) -> Self {
        Self {
            platform,
            success: false,
            platform_post_id: None,
            error: Some(error.to_string()),
            attempts,
        }
    }
}

/// In-place retry budget for transient publish failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based): 1x, 2x, 4x...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Check if an error is transient and should be retried
///
/// Transient errors include network issues and rate limiting.
/// Permanent errors include authentication and validation failures.
fn is_transient_error(error: &QuipcastError) -> bool {
    match error {
        QuipcastError::Platform(platform_error) => platform_error.is_retryable(),
        _ => false,
    }
}

/// Post to a platform with retry logic and exponential backoff
///
/// Returns the outcome of the last attempt together with the number of
/// attempts made.
async fn post_with_retry(
    platform: &dyn Platform,
    content: &str,
    policy: &RetryPolicy,
) -> (Result<String>, u32) {
    let platform_name = platform.name().to_string();
    let mut attempt = 1;

    loop {
        match platform.post(content).await {
            Ok(post_id) => {
                if attempt > 1 {
                    info!(
                        "Successfully posted to {} on attempt {}",
                        platform_name, attempt
                    );
                }
                return (Ok(post_id), attempt);
            }
            Err(e) if is_transient_error(&e) && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "Transient error posting to {} (attempt {}/{}): {}. Retrying in {:?}...",
                    platform_name, attempt, policy.max_attempts, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if is_transient_error(&e) {
                    warn!(
                        "Failed to post to {} after {} attempts: {}",
                        platform_name, attempt, e
                    );
                }
                return (Err(e), attempt);
            }
        }
    }
}

async fn publish_to(
    platform: &mut dyn Platform,
    content: &str,
    policy: RetryPolicy,
) -> PublishResult {
    let platform_name = platform.name().to_string();

    if !platform.is_authenticated() {
        debug!("Authenticating with {}", platform_name);
        if let Err(e) = platform.authenticate().await {
            warn!("Failed to authenticate with {}: {}", platform_name, e);
            return PublishResult::failed(platform_name, &e, 0);
        }
    }

    if let Err(e) = platform.validate_content(content) {
        warn!("Quote rejected by {}: {}", platform_name, e);
        return PublishResult::failed(platform_name, &e, 0);
    }

    info!("Posting to platform: {}", platform_name);
    match post_with_retry(&*platform, content, &policy).await {
        (Ok(post_id), attempts) => {
            info!("Successfully posted to {}: {}", platform_name, post_id);
            PublishResult {
                platform: platform_name,
                success: true,
                platform_post_id: Some(post_id),
                error: None,
                attempts,
            }
        }
        (Err(e), attempts) => {
            warn!("Failed to post to {}: {}", platform_name, e);
            PublishResult::failed(platform_name, &e, attempts)
        }
    }
}

/// Fans a quote out to every configured platform
pub struct Publisher {
    platforms: Vec<Box<dyn Platform>>,
    retry: RetryPolicy,
}

impl Publisher {
    pub fn new(platforms: Vec<Box<dyn Platform>>, retry: RetryPolicy) -> Self {
        Self { platforms, retry }
    }

    pub fn platform_names(&self) -> Vec<&str> {
        self.platforms.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Smallest character limit across platforms, if any has one
    pub fn min_character_limit(&self) -> Option<usize> {
        self.platforms
            .iter()
            .filter_map(|p| p.character_limit())
            .min()
    }

    /// Authenticate every platform up front
    ///
    /// Failures are logged and the platform is kept; [`Publisher::publish`]
    /// retries authentication on the next tick. Returns the number of
    /// platforms that are ready.
    pub async fn authenticate_all(&mut self) -> usize {
        let futures = self.platforms.iter_mut().map(|platform| async move {
            if platform.is_authenticated() {
                return true;
            }
            match platform.authenticate().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        "Could not authenticate with {}: {}. Will retry when posting.",
                        platform.name(),
                        e
                    );
                    false
                }
            }
        });

        join_all(futures).await.into_iter().filter(|ok| *ok).count()
    }

    /// Publish `quote` to all platforms concurrently
    ///
    /// Returns one [`PublishResult`] per platform, in configuration order.
    pub async fn publish(&mut self, quote: &Quote) -> Vec<PublishResult> {
        let retry = self.retry;
        let content = quote.as_str();

        let futures = self
            .platforms
            .iter_mut()
            .map(|platform| publish_to(platform.as_mut(), content, retry));

        join_all(futures).await
    }
}

/// Create platform clients for every enabled platform with credentials
///
/// A platform whose credentials are only partly present is skipped with a
/// warning.
///
/// # Errors
///
/// Returns `ConfigError::NoPlatformsEnabled` when nothing can be posted to,
/// or an error if a client cannot be constructed.
pub async fn create_platforms(config: &Config) -> Result<Vec<Box<dyn Platform>>> {
    use secrecy::{ExposeSecret, SecretString};

    let copy = |secret: &SecretString| SecretString::from(secret.expose_secret().to_string());
    let mut platforms: Vec<Box<dyn Platform>> = Vec::new();

    let bluesky = &config.bluesky;
    if bluesky.enabled {
        match (&bluesky.handle, &bluesky.app_password) {
            (Some(handle), Some(password)) if bluesky.is_complete() => {
                info!("Creating Bluesky platform client");
                let client = BlueskyClient::new(handle.trim().to_string(), copy(password)).await?;
                platforms.push(Box::new(client));
            }
            _ if bluesky.is_partial() => {
                warn!("Bluesky credentials incomplete (need BLUESKY_HANDLE and BLUESKY_APP_PASSWORD); skipping Bluesky");
            }
            _ => debug!("Bluesky not configured"),
        }
    }

    let twitter = &config.twitter;
    if twitter.enabled {
        match (
            &twitter.api_key,
            &twitter.api_secret,
            &twitter.access_token,
            &twitter.access_token_secret,
        ) {
            (Some(api_key), Some(api_secret), Some(access_token), Some(access_token_secret)) => {
                info!("Creating Twitter platform client");
                let client = TwitterClient::new(TwitterCredentials {
                    api_key: copy(api_key),
                    api_secret: copy(api_secret),
                    access_token: copy(access_token),
                    access_token_secret: copy(access_token_secret),
                })?;
                platforms.push(Box::new(client));
            }
            _ if twitter.is_partial() => {
                warn!("Twitter credentials incomplete (need all four TWITTER_* values); skipping Twitter");
            }
            _ => debug!("Twitter not configured"),
        }
    }

    if platforms.is_empty() {
        return Err(ConfigError::NoPlatformsEnabled.into());
    }

    Ok(platforms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::platforms::mock::MockPlatform;
    use secrecy::SecretString;

    fn quote(text: &str) -> Quote {
        Quote::new(text).unwrap()
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 5,
            initial_backoff_ms: 250,
        });
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_publish_all_succeed() {
        let a = MockPlatform::success("a");
        let b = MockPlatform::success("b");
        let (probe_a, probe_b) = (a.probe(), b.probe());

        let mut publisher = Publisher::new(vec![Box::new(a), Box::new(b)], RetryPolicy::default());
        let results = publisher.publish(&quote("Giddy up!")).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success && r.attempts == 1));
        assert_eq!(results[0].platform, "a");
        assert_eq!(results[1].platform, "b");
        assert_eq!(probe_a.auth_call_count(), 1);
        assert_eq!(probe_b.posted_content(), vec!["Giddy up!".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_platform_does_not_block_others() {
        let a = MockPlatform::post_failure("a", PlatformError::Posting("boom".to_string()));
        let b = MockPlatform::success("b");
        let probe_b = b.probe();

        let mut publisher = Publisher::new(vec![Box::new(a), Box::new(b)], RetryPolicy::default());
        let results = publisher.publish(&quote("Giddy up!")).await;

        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 1);
        assert!(results[0].error.as_deref().unwrap().contains("boom"));
        assert!(results[1].success);
        assert_eq!(probe_b.post_call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_with_backoff() {
        let flaky = MockPlatform::flaky(
            "flaky",
            vec![
                PlatformError::Network("reset".to_string()),
                PlatformError::RateLimit("429".to_string()),
            ],
        );
        let probe = flaky.probe();
        let mut publisher = Publisher::new(vec![Box::new(flaky)], RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let results = publisher.publish(&quote("Giddy up!")).await;

        assert!(results[0].success);
        assert_eq!(results[0].attempts, 3);
        assert_eq!(probe.post_call_count(), 3);
        // 1s after the first failure, 2s after the second
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let down = MockPlatform::post_failure("down", PlatformError::Network("down".to_string()));
        let probe = down.probe();
        let mut publisher = Publisher::new(vec![Box::new(down)], RetryPolicy::default());

        let results = publisher.publish(&quote("Giddy up!")).await;

        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 3);
        assert_eq!(probe.post_call_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        for error in [
            PlatformError::Authentication("revoked".to_string()),
            PlatformError::Validation("bad".to_string()),
            PlatformError::Posting("nope".to_string()),
        ] {
            let platform = MockPlatform::post_failure("p", error);
            let probe = platform.probe();
            let mut publisher = Publisher::new(vec![Box::new(platform)], RetryPolicy::default());

            let results = publisher.publish(&quote("Giddy up!")).await;
            assert!(!results[0].success);
            assert_eq!(probe.post_call_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_auth_failure_is_per_platform_result() {
        let a = MockPlatform::auth_failure("a", "bad password");
        let b = MockPlatform::success("b");
        let probe_a = a.probe();

        let mut publisher = Publisher::new(vec![Box::new(a), Box::new(b)], RetryPolicy::default());
        let results = publisher.publish(&quote("Giddy up!")).await;

        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 0);
        assert!(results[0].error.as_deref().unwrap().contains("bad password"));
        assert_eq!(probe_a.post_call_count(), 0);
        assert!(results[1].success);

        // Authentication is attempted again on the next publish
        publisher.publish(&quote("Giddy up again!")).await;
        assert_eq!(probe_a.auth_call_count(), 2);
    }

    #[tokio::test]
    async fn test_over_limit_quote_fails_validation_only_there() {
        let short = MockPlatform::with_limit("short", 5);
        let long = MockPlatform::success("long");
        let probe_short = short.probe();

        let mut publisher =
            Publisher::new(vec![Box::new(short), Box::new(long)], RetryPolicy::default());
        assert_eq!(publisher.min_character_limit(), Some(5));

        let results = publisher.publish(&quote("Giddy up!")).await;
        assert!(!results[0].success);
        assert_eq!(probe_short.post_call_count(), 0);
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_authenticate_all_counts_ready_platforms() {
        let mut publisher = Publisher::new(
            vec![
                Box::new(MockPlatform::success("a")),
                Box::new(MockPlatform::auth_failure("b", "nope")),
                Box::new(MockPlatform::success("c").authenticated()),
            ],
            RetryPolicy::default(),
        );

        assert_eq!(publisher.authenticate_all().await, 2);
        assert_eq!(publisher.platform_names(), vec!["a", "b", "c"]);
        assert_eq!(publisher.len(), 3);
    }

    #[tokio::test]
    async fn test_create_platforms_requires_credentials() {
        let config = Config::default();
        let result = create_platforms(&config).await;
        assert!(matches!(
            result,
            Err(QuipcastError::Config(ConfigError::NoPlatformsEnabled))
        ));
    }

    #[tokio::test]
    async fn test_create_platforms_skips_partial_and_disabled() {
        let mut config = Config::default();
        config.twitter.api_key = Some(SecretString::from("key".to_string()));
        config.bluesky.handle = Some("kramer.bsky.social".to_string());
        config.bluesky.app_password = Some(SecretString::from("pw".to_string()));
        config.bluesky.enabled = false;

        let result = create_platforms(&config).await;
        assert!(matches!(
            result,
            Err(QuipcastError::Config(ConfigError::NoPlatformsEnabled))
        ));
    }

    #[tokio::test]
    async fn test_create_platforms_builds_complete_sets() {
        let mut config = Config::default();
        config.bluesky.handle = Some("kramer.bsky.social".to_string());
        config.bluesky.app_password = Some(SecretString::from("pw".to_string()));
        config.twitter.api_key = Some(SecretString::from("k".to_string()));
        config.twitter.api_secret = Some(SecretString::from("s".to_string()));
        config.twitter.access_token = Some(SecretString::from("t".to_string()));
        config.twitter.access_token_secret = Some(SecretString::from("ts".to_string()));

        let platforms = create_platforms(&config).await.unwrap();
        let names: Vec<&str> = platforms.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["bluesky", "twitter"]);
        assert!(platforms.iter().all(|p| !p.is_authenticated()));
    }
}
