//! Generator used when no API key is configured

use async_trait::async_trait;

use super::QuoteGenerator;
use crate::error::GenerationError;
use crate::quotes::Quote;

/// Always fails with [`GenerationError::NotConfigured`], which sends every
/// tick straight to the fallback quotes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGenerator;

#[async_trait]
impl QuoteGenerator for DisabledGenerator {
    async fn generate(&self) -> Result<Quote, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}
