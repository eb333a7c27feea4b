//! Recent history of posted quotes and its persistence
//!
//! The history is a bounded FIFO: pushing onto a full history evicts the
//! oldest entry. It is persisted as a JSON array of strings behind the
//! [`HistoryStore`] trait so the backing store can be swapped without
//! touching the posting pipeline.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{HistoryError, Result};
use crate::quotes::normalize;

/// Number of posted quotes remembered for duplicate avoidance.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RecentHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a history from oldest-first entries, keeping only the newest
    /// `capacity` of them.
    pub fn from_entries(entries: Vec<String>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Append a newly posted quote, evicting the oldest entries past capacity.
    pub fn push(&mut self, text: impl Into<String>) {
        self.entries.push_back(text.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|entry| entry == text)
    }

    /// Index (0 = oldest) of the most recent occurrence of `text`.
    pub fn last_position(&self, text: &str) -> Option<usize> {
        self.entries.iter().rposition(|entry| entry == text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

/// Storage backend for [`RecentHistory`].
pub trait HistoryStore: Send + Sync {
    /// Load the persisted history.
    ///
    /// History is a best-effort cache: implementations return an empty
    /// history instead of failing when the backing data is missing or
    /// unreadable.
    fn load(&self) -> RecentHistory;

    /// Replace the persisted history with `history`.
    fn save(&self, history: &RecentHistory) -> Result<()>;
}

/// History stored as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
    capacity: usize,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> std::result::Result<Vec<String>, HistoryError> {
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entries: Vec<String> = serde_json::from_str(&content)?;

        // Match what the duplicate filter compares against
        Ok(entries
            .iter()
            .map(|entry| normalize(entry))
            .filter(|entry| !entry.is_empty())
            .collect())
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn load(&self) -> RecentHistory {
        if !self.path.exists() {
            debug!("No history file at {}, starting empty", self.path.display());
            return RecentHistory::new(self.capacity);
        }

        match self.read_entries() {
            Ok(entries) => {
                let history = RecentHistory::from_entries(entries, self.capacity);
                debug!(
                    "Loaded {} history entries from {}",
                    history.len(),
                    self.path.display()
                );
                history
            }
            Err(e) => {
                warn!(
                    "Could not load history from {}: {}. Starting with empty history",
                    self.path.display(),
                    e
                );
                RecentHistory::new(self.capacity)
            }
        }
    }

    fn save(&self, history: &RecentHistory) -> Result<()> {
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(HistoryError::Io)?;

        let json = serde_json::to_vec_pretty(&history.to_vec()).map_err(HistoryError::Serialize)?;

        // Write beside the target and rename over it so a crash never
        // leaves a truncated file behind
        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(HistoryError::Io)?;
        temp.write_all(&json).map_err(HistoryError::Io)?;
        temp.as_file().sync_all().map_err(HistoryError::Io)?;
        temp.persist(&self.path)
            .map_err(|e| HistoryError::Persist(e.to_string()))?;

        debug!(
            "Saved {} history entries to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }
}
