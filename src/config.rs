// Engine configuration and persisted-state key names

use std::time::Duration;

use crate::search::Language;

/// Store key holding the preferred language (`en` | `es`)
pub const LANGUAGE_KEY: &str = "kb-preferred-language";
/// Store key holding the JSON-serialized search history
pub const HISTORY_KEY: &str = "kb-search-history";

/// Default number of history entries kept
pub const DEFAULT_MAX_HISTORY: usize = 10;
/// Default delay before a debounced search fires
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum history entries to keep
    pub max_history: usize,
    /// Quiet period after the last keystroke before searching
    pub debounce_delay: Duration,
    /// Host locale (e.g. `es-MX`), used when no language preference is stored
    pub locale: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_history: DEFAULT_MAX_HISTORY,
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
            locale: None,
        }
    }
}

impl EngineConfig {
    /// Defaults, with the locale taken from `KB_LOCALE` or `LANG`
    pub fn from_env() -> Self {
        let locale = std::env::var("KB_LOCALE")
            .or_else(|_| std::env::var("LANG"))
            .ok()
            .filter(|value| !value.trim().is_empty());

        EngineConfig {
            locale,
            ..EngineConfig::default()
        }
    }

    /// Language implied by the configured locale (English when unset)
    pub fn locale_language(&self) -> Language {
        self.locale
            .as_deref()
            .map(Language::from_locale)
            .unwrap_or_default()
    }
}
