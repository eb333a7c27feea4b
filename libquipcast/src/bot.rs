//! The tick pipeline: select a quote, publish it, record it

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::{QuipcastError, Result};
use crate::generator::{create_generator, QuoteGenerator};
use crate::history::{HistoryStore, JsonFileHistoryStore, RecentHistory};
use crate::publisher::{create_platforms, PublishResult, Publisher, RetryPolicy};
use crate::quotes::{FallbackQuotes, Quote};
use crate::scheduler::Job;
use crate::selection::{select_quote, QuoteSource, SelectionPolicy};

/// Outcome of one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick_id: String,
    pub quote: Quote,
    pub source: QuoteSource,
    /// Generator calls spent selecting the quote
    pub attempts: u32,
    pub results: Vec<PublishResult>,
    /// Whether the quote was added to recent history
    pub history_advanced: bool,
}

impl TickReport {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// At least one platform accepted the post
    pub fn succeeded(&self) -> bool {
        self.success_count() > 0
    }
}

pub struct QuoteBot {
    generator: Box<dyn QuoteGenerator>,
    fallback: FallbackQuotes,
    publisher: Publisher,
    store: Box<dyn HistoryStore>,
    history: RecentHistory,
    policy: SelectionPolicy,
    rng: StdRng,
}

impl QuoteBot {
    /// Assemble a bot; history is loaded from `store` immediately.
    pub fn new(
        generator: Box<dyn QuoteGenerator>,
        publisher: Publisher,
        store: Box<dyn HistoryStore>,
        policy: SelectionPolicy,
    ) -> Self {
        let history = store.load();

        Self {
            generator,
            fallback: FallbackQuotes::builtin(),
            publisher,
            store,
            history,
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    /// Build everything from configuration
    ///
    /// Quotes are held to the smaller of `generator.max_chars` and the
    /// tightest platform limit.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoPlatformsEnabled` if no platform has a full
    /// set of credentials.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let generator = create_generator(&config.generator)?;
        let platforms = create_platforms(config).await?;
        let publisher = Publisher::new(platforms, RetryPolicy::from(&config.retry));

        let max_chars = publisher
            .min_character_limit()
            .map_or(config.generator.max_chars, |limit| {
                limit.min(config.generator.max_chars)
            });

        let store = JsonFileHistoryStore::new(config.history.expand_path(), config.history.capacity);
        info!("Using history file {}", store.path().display());

        Ok(Self::new(
            generator,
            publisher,
            Box::new(store),
            SelectionPolicy {
                max_attempts: config.generator.max_attempts,
                max_chars,
            },
        ))
    }

    pub fn with_fallback(mut self, fallback: FallbackQuotes) -> Self {
        self.fallback = fallback;
        self
    }

    /// Use a deterministic random source for fallback selection
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn history(&self) -> &RecentHistory {
        &self.history
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut Publisher {
        &mut self.publisher
    }

    /// Run one full cycle
    ///
    /// History only advances when at least one platform succeeded; a failed
    /// save is logged and does not fail the tick.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let tick_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("tick", id = %tick_id);

        async {
            let accepted = select_quote(
                self.generator.as_ref(),
                &self.fallback,
                &self.history,
                self.policy,
                &mut self.rng,
            )
            .await?;

            info!(
                source = %accepted.source,
                chars = accepted.quote.char_count(),
                "Selected quote: {}",
                accepted.quote
            );

            let results = self.publisher.publish(&accepted.quote).await;
            let succeeded = results.iter().any(|r| r.success);

            if succeeded {
                self.history.push(accepted.quote.as_str());
                if let Err(e) = self.store.save(&self.history) {
                    warn!("Failed to save history: {}", e);
                }
            } else {
                warn!("Every platform failed; history left unchanged");
            }

            Ok::<_, QuipcastError>(TickReport {
                tick_id: tick_id.clone(),
                quote: accepted.quote,
                source: accepted.source,
                attempts: accepted.attempts,
                results,
                history_advanced: succeeded,
            })
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl Job for QuoteBot {
    async fn run(&mut self) -> Result<()> {
        let report = self.tick().await?;

        for result in &report.results {
            match (&result.platform_post_id, &result.error) {
                (Some(id), _) => info!("  {}: posted ({})", result.platform, id),
                (None, Some(error)) => warn!("  {}: failed ({})", result.platform, error),
                (None, None) => warn!("  {}: failed", result.platform),
            }
        }
        info!(
            "Tick {} complete: {}/{} platform(s) succeeded",
            report.tick_id,
            report.success_count(),
            report.results.len()
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "quote-bot"
    }
}
