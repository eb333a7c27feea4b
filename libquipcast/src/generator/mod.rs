//! Quote generation
//!
//! A [`QuoteGenerator`] produces one candidate quote per call. The bot never
//! trusts a candidate blindly: length and duplicate checks happen in
//! [`selection`](crate::selection), and every generation failure is
//! recovered there by falling back to the built-in quotes.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, Result};
use crate::quotes::Quote;

pub mod chat;
pub mod disabled;

// Scripted generator is available for all builds to support integration tests
pub mod mock;

pub use chat::ChatCompletionGenerator;
pub use disabled::DisabledGenerator;
pub use mock::ScriptedGenerator;

/// Themes a quote can riff on; one is drawn at random per request.
pub const TOPICS: &[&str] = &[
    "climate quirks",
    "changing cities",
    "lifestyle trends",
    "new etiquette rules",
    "cultural confusion",
    "urban chaos",
    "generational behavior",
    "bizarre wellness trends",
    "aging tech",
    "subscription services",
    "self-checkout machines",
    "food delivery",
    "remote work",
    "streaming services",
    "group chats",
    "influencers",
];

#[async_trait]
pub trait QuoteGenerator: Send + Sync {
    /// Produce one normalized candidate quote.
    async fn generate(&self) -> std::result::Result<Quote, GenerationError>;
}

/// Pick a random theme from [`TOPICS`]
pub fn random_topic() -> &'static str {
    TOPICS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("modern life")
}

pub fn system_prompt(persona: &str) -> String {
    format!(
        "You are {persona}, transported into the present day. Speak with your trademark \
         energy, eccentric logic and offbeat charm. You are fascinated and confused by \
         modern technology, trends and culture."
    )
}

pub fn user_prompt(persona: &str, topic: &str, max_chars: usize) -> String {
    format!(
        "Generate a short, punchy quote from {persona} as if they were living in 2025.\n\
         \n\
         The quote should:\n\
         - Be under {max_chars} characters\n\
         - Be about {topic}\n\
         - Reflect {persona}'s personality and speaking style\n\
         - Be funny, self-contained, and a little absurd\n\
         - Avoid cliches like NFTs, smart appliances, dating apps, Zoom and generic AI references\n\
         \n\
         Reply with only the quote: no quotation marks, no attribution, no extra text."
    )
}

/// Build the generator for this configuration
///
/// Without an API key the bot still runs, posting fallback quotes only.
pub fn create_generator(config: &GeneratorConfig) -> Result<Box<dyn QuoteGenerator>> {
    match &config.api_key {
        Some(_) => {
            tracing::info!(
                "Quote generation enabled (model: {}, persona: {})",
                config.model,
                config.persona
            );
            Ok(Box::new(ChatCompletionGenerator::from_config(config)?))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set; only fallback quotes will be posted");
            Ok(Box::new(DisabledGenerator))
        }
    }
}
