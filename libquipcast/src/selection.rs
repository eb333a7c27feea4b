//! Acceptance loop: turn generator output into exactly one postable quote

use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{QuipcastError, Result};
use crate::filter::is_duplicate;
use crate::generator::QuoteGenerator;
use crate::history::RecentHistory;
use crate::quotes::{FallbackQuotes, Quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The generator returned an error
    GenerationFailed,
    /// Every attempt was a duplicate or too long
    RetriesExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    Generated,
    Fallback(FallbackReason),
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteSource::Generated => write!(f, "generated"),
            QuoteSource::Fallback(FallbackReason::GenerationFailed) => {
                write!(f, "fallback (generation failed)")
            }
            QuoteSource::Fallback(FallbackReason::RetriesExhausted) => {
                write!(f, "fallback (retries exhausted)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedQuote {
    pub quote: Quote,
    pub source: QuoteSource,
    /// Generator calls spent on this quote
    pub attempts: u32,
}

/// Limits applied to generated candidates
#[derive(Debug, Clone, Copy)]
pub struct SelectionPolicy {
    pub max_attempts: u32,
    pub max_chars: usize,
}

/// Obtain one quote for this tick
///
/// Asks `generator` up to `policy.max_attempts` times. A generation error
/// ends the loop at once; over-limit and duplicate candidates are discarded
/// and count as attempts. Whenever no generated candidate is accepted a
/// fallback quote is chosen with [`FallbackQuotes::pick`].
///
/// # Errors
///
/// Returns `QuipcastError::InvalidInput` when no fallback quote fits
/// `policy.max_chars`, including an empty fallback set.
pub async fn select_quote<R>(
    generator: &dyn QuoteGenerator,
    fallback: &FallbackQuotes,
    history: &RecentHistory,
    policy: SelectionPolicy,
    rng: &mut R,
) -> Result<AcceptedQuote>
where
    R: Rng + Send + ?Sized,
{
    let mut attempts = 0;
    let mut reason = FallbackReason::RetriesExhausted;

    while attempts < policy.max_attempts {
        attempts += 1;

        let candidate = match generator.generate().await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!("Quote generation failed: {}. Using a fallback quote.", e);
                reason = FallbackReason::GenerationFailed;
                break;
            }
        };

        if !candidate.fits(policy.max_chars) {
            debug!(
                "Attempt {}/{}: rejected {} character quote (limit {})",
                attempts,
                policy.max_attempts,
                candidate.char_count(),
                policy.max_chars
            );
            continue;
        }

        if is_duplicate(candidate.as_str(), history) {
            debug!(
                "Attempt {}/{}: rejected recently posted quote",
                attempts, policy.max_attempts
            );
            continue;
        }

        info!("Accepted generated quote after {} attempt(s)", attempts);
        return Ok(AcceptedQuote {
            quote: candidate,
            source: QuoteSource::Generated,
            attempts,
        });
    }

    if reason == FallbackReason::RetriesExhausted {
        warn!(
            "No unique quote after {} attempts. Using a fallback quote.",
            attempts
        );
    }

    let quote = fallback
        .pick(history, policy.max_chars, rng)
        .ok_or_else(|| {
            QuipcastError::InvalidInput(format!(
                "No fallback quote fits within {} characters",
                policy.max_chars
            ))
        })?;

    if history.contains(quote.as_str()) {
        warn!("Every fallback quote was posted recently; reusing the oldest one");
    }

    Ok(AcceptedQuote {
        quote,
        source: QuoteSource::Fallback(reason),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generator::ScriptedGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const POLICY: SelectionPolicy = SelectionPolicy {
        max_attempts: 10,
        max_chars: 280,
    };

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[tokio::test]
    async fn test_accepts_first_unique_quote() {
        let generator = ScriptedGenerator::always("Giddy up!");
        let history = RecentHistory::new(100);

        let accepted = select_quote(
            &generator,
            &FallbackQuotes::builtin(),
            &history,
            POLICY,
            &mut rng(),
        )
        .await
        .unwrap();

        assert_eq!(accepted.quote.as_str(), "Giddy up!");
        assert_eq!(accepted.source, QuoteSource::Generated);
        assert_eq!(accepted.attempts, 1);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_skips_duplicates_and_over_limit() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Q1".to_string()),
            Ok("x".repeat(281)),
            Ok("\"Q1\"".to_string()),
            Ok("Q3".to_string()),
        ]);
        let history = RecentHistory::from_entries(vec!["Q1".to_string(), "Q2".to_string()], 100);

        let accepted = select_quote(
            &generator,
            &FallbackQuotes::builtin(),
            &history,
            POLICY,
            &mut rng(),
        )
        .await
        .unwrap();

        assert_eq!(accepted.quote.as_str(), "Q3");
        assert_eq!(accepted.source, QuoteSource::Generated);
        assert_eq!(accepted.attempts, 4);
    }

    #[tokio::test]
    async fn test_generation_error_falls_back_immediately() {
        let generator = ScriptedGenerator::failing(GenerationError::Timeout("30s".to_string()));
        let fallback = FallbackQuotes::builtin();

        let accepted = select_quote(
            &generator,
            &fallback,
            &RecentHistory::new(100),
            POLICY,
            &mut rng(),
        )
        .await
        .unwrap();

        assert_eq!(generator.calls(), 1);
        assert_eq!(
            accepted.source,
            QuoteSource::Fallback(FallbackReason::GenerationFailed)
        );
        assert!(fallback.quotes().contains(&accepted.quote));
    }

    #[tokio::test]
    async fn test_error_after_duplicates_still_stops() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Q1".to_string()),
            Err(GenerationError::EmptyResponse),
        ]);
        let history = RecentHistory::from_entries(vec!["Q1".to_string()], 100);

        let accepted = select_quote(
            &generator,
            &FallbackQuotes::builtin(),
            &history,
            POLICY,
            &mut rng(),
        )
        .await
        .unwrap();

        assert_eq!(generator.calls(), 2);
        assert_eq!(accepted.attempts, 2);
        assert_eq!(
            accepted.source,
            QuoteSource::Fallback(FallbackReason::GenerationFailed)
        );
    }

    #[tokio::test]
    async fn test_budget_exhausted_by_duplicates() {
        let generator = ScriptedGenerator::always("Q1");
        let history = RecentHistory::from_entries(vec!["Q1".to_string()], 100);

        let accepted = select_quote(
            &generator,
            &FallbackQuotes::builtin(),
            &history,
            POLICY,
            &mut rng(),
        )
        .await
        .unwrap();

        assert_eq!(generator.calls(), 10);
        assert_eq!(
            accepted.source,
            QuoteSource::Fallback(FallbackReason::RetriesExhausted)
        );
        assert_ne!(accepted.quote.as_str(), "Q1");
    }

    #[tokio::test]
    async fn test_fallback_avoids_history() {
        let generator = ScriptedGenerator::failing(GenerationError::NotConfigured);
        let fallback = FallbackQuotes::from_texts(["A", "B", "C"]);
        let history = RecentHistory::from_entries(vec!["A".to_string(), "C".to_string()], 100);

        for seed in 0..10 {
            let accepted = select_quote(
                &generator,
                &fallback,
                &history,
                POLICY,
                &mut StdRng::seed_from_u64(seed),
            )
            .await
            .unwrap();
            assert_eq!(accepted.quote.as_str(), "B");
        }
    }

    #[tokio::test]
    async fn test_all_fallbacks_recent_reuses_oldest() {
        let generator = ScriptedGenerator::failing(GenerationError::NotConfigured);
        let fallback = FallbackQuotes::from_texts(["A", "B"]);
        let history = RecentHistory::from_entries(
            vec!["B".to_string(), "A".to_string(), "x".to_string()],
            100,
        );

        let accepted = select_quote(&generator, &fallback, &history, POLICY, &mut rng())
            .await
            .unwrap();
        assert_eq!(accepted.quote.as_str(), "B");
    }

    #[tokio::test]
    async fn test_empty_fallback_set_is_error() {
        let generator = ScriptedGenerator::failing(GenerationError::NotConfigured);
        let fallback = FallbackQuotes::from_texts(Vec::<String>::new());

        let result = select_quote(
            &generator,
            &fallback,
            &RecentHistory::new(100),
            POLICY,
            &mut rng(),
        )
        .await;
        assert!(matches!(result, Err(QuipcastError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_fallback_never_exceeds_tight_limit() {
        let generator = ScriptedGenerator::failing(GenerationError::NotConfigured);
        let policy = SelectionPolicy {
            max_attempts: 10,
            max_chars: 40,
        };

        // No built-in quote is that short
        let result = select_quote(
            &generator,
            &FallbackQuotes::builtin(),
            &RecentHistory::new(100),
            policy,
            &mut rng(),
        )
        .await;
        assert!(matches!(result, Err(QuipcastError::InvalidInput(_))));

        let fallback = FallbackQuotes::from_texts([
            "This one is far too long to squeeze into forty characters",
            "Giddy up!",
        ]);
        for seed in 0..10 {
            let accepted = select_quote(
                &generator,
                &fallback,
                &RecentHistory::new(100),
                policy,
                &mut StdRng::seed_from_u64(seed),
            )
            .await
            .unwrap();
            assert!(accepted.quote.fits(40));
            assert_eq!(accepted.quote.as_str(), "Giddy up!");
        }
    }

    #[test]
    fn test_source_display() {
        assert_eq!(QuoteSource::Generated.to_string(), "generated");
        assert_eq!(
            QuoteSource::Fallback(FallbackReason::RetriesExhausted).to_string(),
            "fallback (retries exhausted)"
        );
    }
}
