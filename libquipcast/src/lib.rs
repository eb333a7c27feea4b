//! Quipcast - a scheduled quote bot for social media
//!
//! Each tick generates an in-character quote with a chat-completion model,
//! rejects repeats of recently posted quotes, falls back to a built-in set
//! when generation fails, and publishes the result to Bluesky and Twitter.

pub mod bot;
pub mod config;
pub mod error;
pub mod filter;
pub mod generator;
pub mod history;
pub mod logging;
pub mod platforms;
pub mod publisher;
pub mod quotes;
pub mod scheduler;
pub mod selection;

// Re-export commonly used types
pub use bot::{QuoteBot, TickReport};
pub use config::Config;
pub use error::{QuipcastError, Result};
pub use history::{HistoryStore, JsonFileHistoryStore, RecentHistory};
pub use publisher::{PublishResult, Publisher, RetryPolicy};
pub use quotes::{FallbackQuotes, Quote};
pub use scheduler::{Job, Scheduler};
pub use selection::{AcceptedQuote, FallbackReason, QuoteSource};
