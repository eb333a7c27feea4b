//! Platform abstraction and implementations
//!
//! Every social network the bot publishes to implements [`Platform`]. The
//! publisher holds them as `Vec<Box<dyn Platform>>` and treats them
//! uniformly; which ones exist for a run is decided once at startup by
//! [`create_platforms`](crate::publisher::create_platforms) from the
//! credentials that are present.
//!
//! # Examples
//!
//! ```no_run
//! use libquipcast::platforms::{Platform, twitter::TwitterClient};
//!
//! # async fn example(mut platform: TwitterClient) -> libquipcast::error::Result<()> {
//! if !platform.is_authenticated() {
//!     platform.authenticate().await?;
//! }
//!
//! platform.validate_content("Giddy up!")?;
//! let post_id = platform.post("Giddy up!").await?;
//! println!("Posted to {}: {}", platform.name(), post_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::{PlatformError, Result};

pub mod bluesky;
pub mod twitter;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Platform trait for unified social media platform interactions
#[async_trait]
pub trait Platform: Send + Sync {
    /// Authenticate with the platform
    ///
    /// Called by the publisher before posting whenever
    /// [`is_authenticated`](Platform::is_authenticated) is false.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` for rejected credentials, or
    /// `PlatformError::Network` if the service could not be reached.
    async fn authenticate(&mut self) -> Result<()>;

    /// Publish `content` and return the platform-specific post ID
    /// (an AT URI for Bluesky, a tweet ID for Twitter).
    ///
    /// # Errors
    ///
    /// Implementations classify failures so the publisher can decide whether
    /// to retry: `RateLimit` and `Network` are retried, everything else is
    /// not.
    async fn post(&self, content: &str) -> Result<String>;

    /// Check content against platform rules before posting
    ///
    /// The default implementation rejects empty content and content longer
    /// than [`character_limit`](Platform::character_limit).
    fn validate_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(PlatformError::Validation("Content cannot be empty".to_string()).into());
        }

        if let Some(limit) = self.character_limit() {
            let length = content.chars().count();
            if length > limit {
                return Err(PlatformError::Validation(format!(
                    "Content exceeds {}'s {} character limit (current: {} characters)",
                    self.name(),
                    limit,
                    length
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Lowercase platform identifier (e.g. "bluesky", "twitter")
    fn name(&self) -> &str;

    /// Maximum post length in characters, or `None` for no hard limit
    fn character_limit(&self) -> Option<usize>;

    /// Whether the platform is ready to post without authenticating first
    fn is_authenticated(&self) -> bool;
}
