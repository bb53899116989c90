// Snippet extraction and term highlighting for search results

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::fuzzy::fuzzy_match;

/// Opening marker wrapped around highlighted terms
pub const HIGHLIGHT_OPEN: &str = "<mark class=\"search-highlight\">";
/// Closing marker
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

/// A content word is a hit when it scores above this against a query word
const SNIPPET_MATCH_THRESHOLD: f64 = 0.7;
/// Snippets this short (in characters) or shorter are dropped
const MIN_SNIPPET_CHARS: usize = 20;
/// Rough characters per word when sizing the window
const CHARS_PER_WORD: usize = 20;

/// Excerpt of document content around a match
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    /// Lower-cased excerpt
    pub text: String,
    /// Index of the first word of the excerpt within the content
    pub start_pos: usize,
    /// `text` with query words wrapped in highlight markers
    pub highlighted: String,
}

/// Whole-word, case-insensitive highlighter for the words of a query
#[derive(Debug, Clone)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    /// Build a highlighter; single-character query words are ignored
    pub fn new(query: &str) -> Self {
        let mut words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.chars().count() > 1)
            .map(regex::escape)
            .collect();

        if words.is_empty() {
            return Highlighter { pattern: None };
        }

        // Longest alternatives first so a word is never cut short by its own prefix
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        words.dedup();

        let source = format!(r"(?i)\b(?:{})\b", words.join("|"));
        let pattern = match Regex::new(&source) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Failed to build highlight pattern: {}", e);
                None
            }
        };

        Highlighter { pattern }
    }

    /// Wrap every query word occurring in `text` with the highlight markers
    pub fn highlight(&self, text: &str) -> String {
        match self.pattern {
            Some(ref pattern) => pattern
                .replace_all(text, format!("{}${{0}}{}", HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE).as_str())
                .into_owned(),
            None => text.to_string(),
        }
    }
}

/// Extracts snippets for one query, reusable across every result of a search
#[derive(Debug, Clone)]
pub struct SnippetBuilder {
    query_words: Vec<String>,
    highlighter: Highlighter,
}

impl SnippetBuilder {
    pub fn new(query: &str) -> Self {
        SnippetBuilder {
            query_words: query
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            highlighter: Highlighter::new(query),
        }
    }

    /// Snippets around the first `max_snippets` matching words of `content`
    ///
    /// Each window spans `snippet_length / 20` words before the hit and runs
    /// up to (not including) the same offset after it. Windows are taken in
    /// content order; one that comes out too short is dropped, not replaced.
    pub fn build(&self, content: &str, max_snippets: usize, snippet_length: usize) -> Vec<Snippet> {
        if content.is_empty() || self.query_words.is_empty() {
            return Vec::new();
        }

        let lowered = content.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        let mut positions: Vec<usize> = Vec::new();
        for query_word in &self.query_words {
            for (index, word) in words.iter().enumerate() {
                if fuzzy_match(query_word, word) > SNIPPET_MATCH_THRESHOLD {
                    positions.push(index);
                }
            }
        }
        positions.sort_unstable();
        positions.dedup();

        let words_per_side = snippet_length / CHARS_PER_WORD;

        positions
            .into_iter()
            .take(max_snippets)
            .filter_map(|pos| {
                let start = pos.saturating_sub(words_per_side);
                let end = pos.saturating_add(words_per_side).min(words.len());
                if start >= end {
                    return None;
                }

                let text = words[start..end].join(" ");
                if text.chars().count() <= MIN_SNIPPET_CHARS {
                    return None;
                }

                Some(Snippet {
                    highlighted: self.highlighter.highlight(&text),
                    text,
                    start_pos: start,
                })
            })
            .collect()
    }
}

/// Snippets of `content` around approximate occurrences of the query words
pub fn generate_snippets(
    query: &str,
    content: &str,
    max_snippets: usize,
    snippet_length: usize,
) -> Vec<Snippet> {
    SnippetBuilder::new(query).build(content, max_snippets, snippet_length)
}

/// Highlight the words of `query` inside `text`
pub fn highlight_text(text: &str, query: &str) -> String {
    Highlighter::new(query).highlight(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_with_hits(len: usize, hits: &[usize]) -> String {
        (0..len)
            .map(|i| {
                if hits.contains(&i) {
                    "billing".to_string()
                } else {
                    format!("filler{}", i)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_snippets_follow_content_order() {
        let content = content_with_hits(40, &[30, 5]);
        let snippets = generate_snippets("billing", &content, 2, 150);

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].start_pos, 0);
        assert_eq!(snippets[1].start_pos, 23);
        assert!(snippets[0].text.starts_with("filler0 "));
        assert!(snippets[0].text.ends_with(" filler11"));
        assert!(snippets[1].highlighted.contains("<mark class=\"search-highlight\">billing</mark>"));
    }

    #[test]
    fn test_snippet_count_is_bounded() {
        let content = content_with_hits(60, &[5, 20, 40]);
        assert_eq!(generate_snippets("billing", &content, 1, 150).len(), 1);
        assert_eq!(generate_snippets("billing", &content, 2, 150).len(), 2);
        assert!(generate_snippets("billing", &content, 0, 150).is_empty());
    }

    #[test]
    fn test_overlapping_query_words_share_positions() {
        let content = content_with_hits(40, &[5, 30]);
        let snippets = generate_snippets("bill billing", &content, 4, 150);

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].start_pos, 0);
        assert_eq!(snippets[1].start_pos, 23);
    }

    #[test]
    fn test_huge_snippet_length_covers_content() {
        let content = content_with_hits(10, &[4]);
        let snippets = generate_snippets("billing", &content, 2, usize::MAX);

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].start_pos, 0);
        assert_eq!(snippets[0].text, content);
    }

    #[test]
    fn test_short_snippets_are_dropped() {
        assert!(generate_snippets("billing", "a billing b", 2, 150).is_empty());
        assert!(generate_snippets("billing", "", 2, 150).is_empty());
        assert!(generate_snippets("", "some billing content here for you", 2, 150).is_empty());
    }

    #[test]
    fn test_snippet_text_is_lowercase() {
        let content = "Update the Billing address on your account settings page";
        let snippets = generate_snippets("billing", content, 2, 150);

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, content.to_lowercase());
    }

    #[test]
    fn test_highlight_whole_words_case_insensitive() {
        let highlighted = highlight_text("Reset your Password, not the passwords", "password");
        assert_eq!(
            highlighted,
            "Reset your <mark class=\"search-highlight\">Password</mark>, not the passwords"
        );
    }

    #[test]
    fn test_highlight_escapes_metacharacters() {
        assert_eq!(highlight_text("abc a.c", "a.c"), "abc <mark class=\"search-highlight\">a.c</mark>");
        assert_eq!(highlight_text("ab", "(ab"), "ab");
    }

    #[test]
    fn test_highlight_skips_single_characters() {
        assert_eq!(highlight_text("a bill", "a"), "a bill");
        assert_eq!(
            highlight_text("a bill", "a bill"),
            "a <mark class=\"search-highlight\">bill</mark>"
        );
    }

    #[test]
    fn test_highlight_does_not_touch_markup() {
        let highlighted = highlight_text("search the mark", "mark search class");
        assert_eq!(
            highlighted,
            "<mark class=\"search-highlight\">search</mark> the <mark class=\"search-highlight\">mark</mark>"
        );
    }
}
