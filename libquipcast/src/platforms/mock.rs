//! Mock platform implementation for testing
//!
//! A configurable platform that can simulate successes, scripted transient
//! failures, permanent failures and latency. Used by the publisher and bot
//! tests to exercise multi-platform fan-out without credentials or network
//! access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name (e.g., "mock-bluesky")
    pub name: String,

    /// Whether authentication should succeed
    pub auth_succeeds: bool,

    /// Error message to return on authentication failure
    pub auth_error: Option<String>,

    /// Errors returned by successive `post` calls before falling through to
    /// `post_error` or success
    pub scripted_failures: Arc<Mutex<VecDeque<PlatformError>>>,

    /// Error returned by every `post` once the script is exhausted
    pub post_error: Option<PlatformError>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Character limit for validation
    pub character_limit: Option<usize>,

    pub auth_call_count: Arc<Mutex<usize>>,
    pub post_call_count: Arc<Mutex<usize>>,

    /// Posts that have been made (for verification)
    pub posted_content: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            auth_error: None,
            scripted_failures: Arc::new(Mutex::new(VecDeque::new())),
            post_error: None,
            delay: Duration::from_millis(0),
            character_limit: None,
            auth_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            posted_content: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Shared view of a mock's counters that survives boxing the platform
#[derive(Debug, Clone)]
pub struct MockProbe {
    auth_call_count: Arc<Mutex<usize>>,
    post_call_count: Arc<Mutex<usize>>,
    posted_content: Arc<Mutex<Vec<String>>>,
}

impl MockProbe {
    pub fn auth_call_count(&self) -> usize {
        *lock(&self.auth_call_count)
    }

    pub fn post_call_count(&self) -> usize {
        *lock(&self.post_call_count)
    }

    pub fn posted_content(&self) -> Vec<String> {
        lock(&self.posted_content).clone()
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails authentication
    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            auth_succeeds: false,
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform whose every post fails with `error`
    pub fn post_failure(name: &str, error: PlatformError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            post_error: Some(error),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails with each of `failures` in turn
    /// and then succeeds
    pub fn flaky(name: &str, failures: Vec<PlatformError>) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            scripted_failures: Arc::new(Mutex::new(failures.into())),
            ..Default::default()
        })
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    pub fn with_limit(name: &str, limit: usize) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            character_limit: Some(limit),
            ..Default::default()
        })
    }

    /// Mark the platform as already authenticated
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn probe(&self) -> MockProbe {
        MockProbe {
            auth_call_count: Arc::clone(&self.config.auth_call_count),
            post_call_count: Arc::clone(&self.config.post_call_count),
            posted_content: Arc::clone(&self.config.posted_content),
        }
    }

    pub fn auth_call_count(&self) -> usize {
        *lock(&self.config.auth_call_count)
    }

    pub fn post_call_count(&self) -> usize {
        *lock(&self.config.post_call_count)
    }

    pub fn posted_content(&self) -> Vec<String> {
        lock(&self.config.posted_content).clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn authenticate(&mut self) -> Result<()> {
        *lock(&self.config.auth_call_count) += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.auth_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            let error_msg = self
                .config
                .auth_error
                .clone()
                .unwrap_or_else(|| "Mock authentication failed".to_string());
            Err(PlatformError::Authentication(error_msg).into())
        }
    }

    async fn post(&self, content: &str) -> Result<String> {
        *lock(&self.config.post_call_count) += 1;

        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        let scripted = lock(&self.config.scripted_failures).pop_front();
        if let Some(error) = scripted.or_else(|| self.config.post_error.clone()) {
            return Err(error.into());
        }

        lock(&self.config.posted_content).push(content.to_string());

        let post_id = format!("{}:mock-{}", self.config.name, uuid::Uuid::new_v4());
        Ok(post_id)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuipcastError;

    #[tokio::test]
    async fn test_mock_success() {
        let mut platform = MockPlatform::success("test");

        assert!(!platform.is_authenticated());
        assert_eq!(platform.name(), "test");
        assert_eq!(platform.character_limit(), None);

        platform.authenticate().await.unwrap();
        assert!(platform.is_authenticated());
        assert_eq!(platform.auth_call_count(), 1);

        let post_id = platform.post("Test content").await.unwrap();
        assert!(post_id.starts_with("test:mock-"));
        assert_eq!(platform.post_call_count(), 1);
        assert_eq!(platform.posted_content(), vec!["Test content".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_auth_failure() {
        let mut platform = MockPlatform::auth_failure("test", "Invalid credentials");

        let result = platform.authenticate().await;
        assert!(!platform.is_authenticated());
        assert_eq!(platform.auth_call_count(), 1);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_mock_post_failure() {
        let platform = MockPlatform::post_failure(
            "test",
            PlatformError::Posting("duplicate status".to_string()),
        )
        .authenticated();

        for _ in 0..2 {
            let result = platform.post("Test content").await;
            assert!(matches!(
                result,
                Err(QuipcastError::Platform(PlatformError::Posting(_)))
            ));
        }
        assert_eq!(platform.post_call_count(), 2);
        assert!(platform.posted_content().is_empty());
    }

    #[tokio::test]
    async fn test_mock_flaky_recovers_after_script() {
        let platform = MockPlatform::flaky(
            "test",
            vec![
                PlatformError::Network("reset".to_string()),
                PlatformError::RateLimit("slow down".to_string()),
            ],
        )
        .authenticated();

        assert!(platform.post("one").await.is_err());
        assert!(platform.post("two").await.is_err());
        assert!(platform.post("three").await.is_ok());
        assert_eq!(platform.posted_content(), vec!["three".to_string()]);
    }

    #[tokio::test]
    async fn test_probe_outlives_boxing() {
        let platform = MockPlatform::success("test").authenticated();
        let probe = platform.probe();

        let boxed: Box<dyn Platform> = Box::new(platform);
        boxed.post("Giddy up!").await.unwrap();

        assert_eq!(probe.post_call_count(), 1);
        assert_eq!(probe.posted_content(), vec!["Giddy up!".to_string()]);
        assert_eq!(probe.auth_call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_with_delay() {
        let platform = MockPlatform::with_delay("test", Duration::from_millis(50)).authenticated();

        let start = tokio::time::Instant::now();
        platform.post("Test").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_mock_with_character_limit() {
        let platform = MockPlatform::with_limit("test", 10);

        assert_eq!(platform.character_limit(), Some(10));
        assert!(platform.validate_content("Short").is_ok());

        let result = platform.validate_content("This is way too long");
        assert!(result.unwrap_err().to_string().contains("character limit"));
    }

    #[tokio::test]
    async fn test_mock_requires_authentication() {
        let platform = MockPlatform::success("test");

        let result = platform.post("Test").await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Not authenticated"));
    }
}
