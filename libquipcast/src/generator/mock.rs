//! Scripted generator for testing
//!
//! Replays a fixed sequence of outcomes, then repeats a final outcome for
//! every further call. Counts calls so tests can assert how much of the
//! attempt budget a tick spent.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::QuoteGenerator;
use crate::error::GenerationError;
use crate::quotes::Quote;

type Outcome = Result<String, GenerationError>;

#[derive(Debug)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Outcome>>,
    then: Outcome,
    calls: Arc<AtomicUsize>,
}

impl ScriptedGenerator {
    /// Replay `outcomes` in order; calls past the end fail with an HTTP error
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            then: Err(GenerationError::Http("script exhausted".to_string())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return `text` on every call
    pub fn always(text: &str) -> Self {
        Self::new(Vec::new()).then(Ok(text.to_string()))
    }

    /// Fail with `error` on every call
    pub fn failing(error: GenerationError) -> Self {
        Self::new(Vec::new()).then(Err(error))
    }

    /// Outcome repeated once the script runs out
    pub fn then(mut self, outcome: Outcome) -> Self {
        self.then = outcome;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter that survives boxing the generator
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl QuoteGenerator for ScriptedGenerator {
    async fn generate(&self) -> Result<Quote, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let text = next.unwrap_or_else(|| self.then.clone())?;
        Quote::new(&text).ok_or(GenerationError::EmptyResponse)
    }
}
