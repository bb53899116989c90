// Search history module for the help desk search engine
// Bounded, most-recent-first list of past queries mirrored into a key-value store

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::index::Language;
use crate::config::HISTORY_KEY;
use crate::error::Result;
use crate::store::Store;

/// Queries shorter than this (after trimming) are not recorded
const MIN_QUERY_CHARS: usize = 2;

/// Search history entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub query: String,
    /// Unix time in milliseconds
    pub timestamp: i64,
    pub language: Language,
}

/// Search history manager
pub struct SearchHistory {
    /// History entries (recent first)
    history: VecDeque<HistoryEntry>,
    /// Maximum history entries to keep
    max_history: usize,
    /// Persistence backend
    store: Arc<dyn Store>,
}

impl SearchHistory {
    /// Create a history and load whatever the store holds
    /// Unreadable stored history starts the session empty
    pub fn load(store: Arc<dyn Store>, max_history: usize) -> Self {
        let mut history = SearchHistory {
            history: VecDeque::new(),
            max_history,
            store,
        };

        match history.read_stored() {
            Ok(entries) => history.history = entries,
            Err(e) => warn!("Ignoring stored search history: {}", e),
        }
        history.history.truncate(max_history);

        history
    }

    fn read_stored(&self) -> Result<VecDeque<HistoryEntry>> {
        match self.store.get(HISTORY_KEY)? {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Ok(VecDeque::new()),
        }
    }

    fn save(&self) -> Result<()> {
        let data = serde_json::to_string(&self.history)?;
        self.store.set(HISTORY_KEY, &data)
    }

    /// Record a search query
    ///
    /// A query already present (case-insensitively) moves to the front instead
    /// of being duplicated; the oldest entries fall off past the bound.
    pub fn record(&mut self, query: &str, language: Language) {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return;
        }

        let query_lower = query.to_lowercase();
        self.history
            .retain(|entry| entry.query.to_lowercase() != query_lower);

        self.history.push_front(HistoryEntry {
            query: query.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            language,
        });

        // Trim history
        self.history.truncate(self.max_history);

        if let Err(e) = self.save() {
            warn!("Failed to persist search history: {}", e);
        }
    }

    /// Entries recorded in `language`, most recent first
    pub fn entries(&self, language: Language) -> Vec<HistoryEntry> {
        self.history
            .iter()
            .filter(|entry| entry.language == language)
            .cloned()
            .collect()
    }

    /// Clear history in memory and in the store
    pub fn clear(&mut self) {
        self.history.clear();

        if let Err(e) = self.store.remove(HISTORY_KEY) {
            warn!("Failed to remove stored search history: {}", e);
        }
        debug!("Search history cleared");
    }

    /// Get history size
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
