// Search engine service for the help desk knowledge base
// Owns the corpus, the active language, the history and the debounce timer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::corpus::CorpusSource;
use super::debounce::Debouncer;
use super::history::{HistoryEntry, SearchHistory};
use super::index::{CategoryView, Language, SearchIndex, SearchOptions, SearchResult};
use super::suggestions::{autocomplete, did_you_mean, Correction};
use crate::config::{EngineConfig, LANGUAGE_KEY};
use crate::store::Store;

/// Corpus shared with background loads and debounced searches
#[derive(Default)]
struct CorpusSlot {
    index: RwLock<Arc<SearchIndex>>,
    loaded: AtomicBool,
}

impl CorpusSlot {
    fn install(&self, index: SearchIndex) -> usize {
        let count = index.len();
        *self.index.write() = Arc::new(index);
        self.loaded.store(true, Ordering::Release);
        count
    }

    fn snapshot(&self) -> Arc<SearchIndex> {
        self.index.read().clone()
    }
}

/// Knowledge-base search service
///
/// Construct one per session and pass it to whoever needs it; every method
/// takes `&self`, so it can be shared behind an `Arc`. Until a corpus is
/// installed every query answers with an empty result.
pub struct SearchEngine {
    corpus: Arc<CorpusSlot>,
    language: RwLock<Language>,
    history: Mutex<SearchHistory>,
    store: Arc<dyn Store>,
    debouncer: Debouncer,
}

impl SearchEngine {
    /// Create an engine with an empty corpus
    /// Language: stored preference, then the configured locale, then English
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let language = match store.get(LANGUAGE_KEY) {
            Ok(Some(code)) => Language::parse(&code).unwrap_or_else(|| config.locale_language()),
            Ok(None) => config.locale_language(),
            Err(e) => {
                warn!("Failed to read language preference: {}", e);
                config.locale_language()
            }
        };

        SearchEngine {
            corpus: Arc::new(CorpusSlot::default()),
            language: RwLock::new(language),
            history: Mutex::new(SearchHistory::load(store.clone(), config.max_history)),
            store,
            debouncer: Debouncer::new(config.debounce_delay),
        }
    }

    /// Create an engine around an already loaded corpus
    pub fn with_index(store: Arc<dyn Store>, config: EngineConfig, index: SearchIndex) -> Self {
        let engine = SearchEngine::new(store, config);
        engine.corpus.install(index);
        engine
    }

    /// Load the corpus, replacing the current one
    /// A failed load installs an empty corpus; returns the document count
    pub async fn load_corpus(&self, source: &CorpusSource) -> usize {
        let index = source.fetch_or_empty().await;
        self.corpus.install(index)
    }

    /// Start loading the corpus in the background on the current runtime
    /// Returns `None` when called outside a tokio runtime
    pub fn spawn_load(&self, source: CorpusSource) -> Option<JoinHandle<usize>> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime, corpus from {} not loaded", source);
                return None;
            }
        };

        let corpus = self.corpus.clone();
        Some(runtime.spawn(async move {
            let index = source.fetch_or_empty().await;
            corpus.install(index)
        }))
    }

    /// Whether a corpus load has completed (successfully or not)
    pub fn is_loaded(&self) -> bool {
        self.corpus.loaded.load(Ordering::Acquire)
    }

    /// Snapshot of the current corpus
    pub fn corpus(&self) -> Arc<SearchIndex> {
        self.corpus.snapshot()
    }

    pub fn language(&self) -> Language {
        *self.language.read()
    }

    /// Switch language and persist the preference
    pub fn set_language(&self, language: Language) {
        *self.language.write() = language;
        info!("Search language set to {}", language.code());

        if let Err(e) = self.store.set(LANGUAGE_KEY, language.code()) {
            warn!("Failed to persist language preference: {}", e);
        }
    }

    /// Switch language by code; anything other than `en`/`es` is ignored
    pub fn set_language_code(&self, code: &str) -> bool {
        match Language::parse(code) {
            Some(language) => {
                self.set_language(language);
                true
            }
            None => {
                debug!("Ignoring unsupported language {:?}", code);
                false
            }
        }
    }

    fn resolve(&self, options: &SearchOptions) -> SearchOptions {
        SearchOptions {
            language: Some(options.language.unwrap_or_else(|| self.language())),
            ..options.clone()
        }
    }

    /// Ranked results for `query` (the current language unless overridden)
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        self.corpus().search(query, &self.resolve(options))
    }

    /// Search and record the query in the history
    pub fn submit_search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let results = self.search(query, options);
        self.add_to_history(query);
        results
    }

    /// Search once typing pauses, handing the results to `callback`
    ///
    /// A later call before the delay elapses replaces this one. The corpus is
    /// read when the search fires, not when it is requested.
    pub fn debounced_search<F>(&self, query: &str, options: &SearchOptions, callback: F)
    where
        F: FnOnce(Vec<SearchResult>) + Send + 'static,
    {
        let corpus = self.corpus.clone();
        let query = query.to_string();
        let options = self.resolve(options);

        self.debouncer.schedule(move || {
            let results = corpus.snapshot().search(&query, &options);
            callback(results);
        });
    }

    /// Drop a debounced search that has not fired yet
    pub fn cancel_pending_search(&self) -> bool {
        self.debouncer.cancel()
    }

    /// Autocomplete suggestions for a partially typed query
    pub fn suggestions(&self, query: &str, max: usize) -> Vec<String> {
        autocomplete(&self.corpus(), query, self.language(), max)
    }

    /// Spelling corrections drawn from the corpus vocabulary
    pub fn did_you_mean(&self, query: &str, max: usize) -> Vec<Correction> {
        did_you_mean(&self.corpus(), query, self.language(), max)
    }

    /// History for the current language, most recent first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().entries(self.language())
    }

    pub fn add_to_history(&self, query: &str) {
        let language = self.language();
        self.history.lock().record(query, language);
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Categories labelled in the current language
    pub fn categories(&self) -> Vec<CategoryView> {
        self.corpus().category_views(self.language())
    }

    /// Display label of a category in the current language
    pub fn category_label(&self, id: &str) -> Option<String> {
        self.corpus()
            .category(id)
            .map(|category| category.view(self.language()).display_name)
    }
}
