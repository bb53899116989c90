// Search suggestions module for the help desk search engine
// Prefix autocomplete and "did you mean" corrections drawn from the corpus vocabulary

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::fuzzy::word_similarity;
use super::index::{Language, SearchIndex};

/// Autocomplete needs at least this many characters
pub const MIN_AUTOCOMPLETE_CHARS: usize = 2;
/// Default number of autocomplete suggestions
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;
/// Default number of corrections
pub const DEFAULT_MAX_CORRECTIONS: usize = 3;

/// Corrections must be strictly more similar than this...
const CORRECTION_MIN_SIMILARITY: f64 = 0.6;
/// ...and strictly less similar than this (closer terms already match in search)
const CORRECTION_MAX_SIMILARITY: f64 = 0.95;
/// Query words shorter than this are never corrected
const MIN_CORRECTABLE_CHARS: usize = 3;
/// Corrections kept per query word before the global ranking
const CORRECTIONS_PER_WORD: usize = 2;

/// A "did you mean" correction for one query word
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Correction {
    /// Lower-cased query word being corrected
    pub original: String,
    /// Corpus term proposed instead
    pub suggestion: String,
    pub similarity: f64,
}

/// Insertion-ordered set of lower-cased terms
#[derive(Debug, Default)]
struct TermSet {
    terms: Vec<String>,
    seen: HashSet<String>,
}

impl TermSet {
    fn insert(&mut self, term: String) {
        if self.seen.insert(term.clone()) {
            self.terms.push(term);
        }
    }

    fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Autocomplete: title words and keywords starting with `query`
///
/// Title words must be longer than two characters; keywords match as whole
/// strings. Everything is compared and returned lower-cased, deduplicated, in
/// order of first appearance in the corpus.
pub fn autocomplete(index: &SearchIndex, query: &str, language: Language, max: usize) -> Vec<String> {
    let prefix = query.trim().to_lowercase();
    if prefix.chars().count() < MIN_AUTOCOMPLETE_CHARS || max == 0 {
        return Vec::new();
    }

    let mut suggestions = TermSet::default();

    for doc in index.documents() {
        let fields = doc.localized(language);

        for word in fields.title.to_lowercase().split_whitespace() {
            if word.chars().count() > 2 && word.starts_with(&prefix) {
                suggestions.insert(word.to_string());
            }
        }

        for keyword in fields.keywords {
            let keyword = keyword.to_lowercase();
            if keyword.starts_with(&prefix) {
                suggestions.insert(keyword);
            }
        }

        if suggestions.len() >= max {
            break;
        }
    }

    suggestions.terms.truncate(max);
    suggestions.terms
}

/// Every term a correction may propose, for one language
pub fn vocabulary(index: &SearchIndex, language: Language) -> Vec<String> {
    let mut terms = TermSet::default();

    for doc in index.documents() {
        let fields = doc.localized(language);

        for word in fields.title.to_lowercase().split_whitespace() {
            if word.chars().count() > 2 {
                terms.insert(word.to_string());
            }
        }

        for word in fields.content.to_lowercase().split_whitespace() {
            if word.chars().count() > 4 {
                terms.insert(word.to_string());
            }
        }

        for keyword in fields.keywords {
            terms.insert(keyword.to_lowercase());
        }
    }

    terms.terms
}

/// "Did you mean" corrections for the words of `query`
///
/// Each query word of three or more characters is compared against the whole
/// vocabulary; terms that are close but not already near-exact
/// (0.6 < similarity < 0.95) are candidates. The best two per word are pooled
/// and the pool is ranked by similarity.
pub fn did_you_mean(index: &SearchIndex, query: &str, language: Language, max: usize) -> Vec<Correction> {
    let query = query.to_lowercase();
    let query_words: Vec<&str> = query
        .split_whitespace()
        .filter(|word| word.chars().count() >= MIN_CORRECTABLE_CHARS)
        .collect();

    if query_words.is_empty() || max == 0 {
        return Vec::new();
    }

    let terms = vocabulary(index, language);
    let mut corrections = Vec::new();

    for query_word in query_words {
        let mut best_matches: Vec<(&str, f64)> = terms
            .iter()
            .map(|term| (term.as_str(), word_similarity(query_word, term)))
            .filter(|(_, similarity)| {
                *similarity > CORRECTION_MIN_SIMILARITY && *similarity < CORRECTION_MAX_SIMILARITY
            })
            .collect();

        best_matches.sort_by(|a, b| b.1.total_cmp(&a.1));

        corrections.extend(best_matches.into_iter().take(CORRECTIONS_PER_WORD).map(
            |(term, similarity)| Correction {
                original: query_word.to_string(),
                suggestion: term.to_string(),
                similarity,
            },
        ));
    }

    corrections.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    corrections.truncate(max);
    corrections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::index::tests::{reset_password_doc, sample_index};
    use crate::search::index::SearchIndex;

    #[test]
    fn test_autocomplete_title_words() {
        let index = sample_index();
        let suggestions = autocomplete(&index, "se", Language::En, 5);
        assert!(suggestions.contains(&"services".to_string()));
        assert!(suggestions.iter().all(|s| s.starts_with("se")));
    }

    #[test]
    fn test_autocomplete_requires_two_chars() {
        let index = sample_index();
        assert!(autocomplete(&index, "x", Language::En, 5).is_empty());
        assert!(autocomplete(&index, "s", Language::En, 5).is_empty());
        assert!(autocomplete(&index, "", Language::En, 5).is_empty());
    }

    #[test]
    fn test_autocomplete_dedup_and_limit() {
        let index = sample_index();

        // "password" appears as a title word and a keyword
        let suggestions = autocomplete(&index, "PASS", Language::En, 5);
        assert_eq!(suggestions, vec!["password".to_string()]);

        let suggestions = autocomplete(&index, "pa", Language::En, 1);
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn test_autocomplete_uses_language() {
        let index = sample_index();
        let spanish = autocomplete(&index, "fac", Language::Es, 5);
        assert_eq!(spanish, vec!["factura".to_string()]);
        assert!(autocomplete(&index, "fac", Language::En, 5).is_empty());
    }

    #[test]
    fn test_vocabulary_length_rules() {
        let index = SearchIndex::from_parts(vec![reset_password_doc()], Vec::new());
        let terms = vocabulary(&index, Language::En);

        assert!(terms.contains(&"reset".to_string()));
        assert!(terms.contains(&"password".to_string()));
        // "how" and "your" are too short for content words
        assert!(!terms.contains(&"how".to_string()));
        assert!(!terms.contains(&"your".to_string()));
    }

    #[test]
    fn test_did_you_mean_typo() {
        let index = SearchIndex::from_parts(vec![reset_password_doc()], Vec::new());
        let corrections = did_you_mean(&index, "pasword", Language::En, 3);

        assert_eq!(corrections[0].original, "pasword");
        assert_eq!(corrections[0].suggestion, "password");
        assert!((corrections[0].similarity - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_did_you_mean_skips_exact_and_short_words() {
        let index = SearchIndex::from_parts(vec![reset_password_doc()], Vec::new());
        assert!(did_you_mean(&index, "password", Language::En, 3).is_empty());
        assert!(did_you_mean(&index, "rs", Language::En, 3).is_empty());
        assert!(did_you_mean(&index, "", Language::En, 3).is_empty());
    }

    #[test]
    fn test_did_you_mean_band_and_order() {
        let index = sample_index();
        let corrections = did_you_mean(&index, "servises suport paymnt biling", Language::En, 10);

        assert!(!corrections.is_empty());
        assert!(corrections.len() <= 8);
        for correction in &corrections {
            assert!(correction.similarity > 0.6 && correction.similarity < 0.95);
        }
        assert!(corrections.windows(2).all(|pair| pair[0].similarity >= pair[1].similarity));

        let limited = did_you_mean(&index, "servises suport paymnt biling", Language::En, 3);
        assert_eq!(limited.len(), 3);
    }
}
