// Fuzzy string matching module for the help desk search engine
// Edit distance, per-word similarity and the containment-first fuzzy score

/// Base score for a query found verbatim inside the text
const CONTAINMENT_BASE: f64 = 0.9;
/// Weight of the query/text length ratio in the containment bonus
const CONTAINMENT_LENGTH_WEIGHT: f64 = 0.1;
/// Weight of the match position in the containment bonus
const CONTAINMENT_POSITION_WEIGHT: f64 = 0.1;
/// A query word counts as matched only above this similarity
pub const WORD_MATCH_THRESHOLD: f64 = 0.6;
/// Scale applied to the averaged per-word fallback score
const FUZZY_FALLBACK_SCALE: f64 = 0.8;

/// Calculate Levenshtein distance between two strings
/// Insertions, deletions and substitutions each cost 1; compares characters, not bytes
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Similarity of two words: `1 - distance / longest length`
/// Returns 1.0 for two empty words
pub fn word_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}

/// Score how well `query` matches `text`, case-insensitively
///
/// A verbatim occurrence always scores at least 0.9, rewarded for a query that
/// covers more of the text and for an earlier position (so it can slightly
/// exceed 1.0). Otherwise every query word is paired with its most similar
/// text word; words above [`WORD_MATCH_THRESHOLD`] contribute their similarity,
/// and the average over all query words is scaled by 0.8.
///
/// This is a ranking score, not a probability. Empty inputs score 0.
pub fn fuzzy_match(query: &str, text: &str) -> f64 {
    let query = query.trim().to_lowercase();
    let text = text.to_lowercase();

    if query.is_empty() || text.is_empty() {
        return 0.0;
    }

    if let Some(byte_pos) = text.find(&query) {
        let text_len = text.chars().count() as f64;
        let position = text[..byte_pos].chars().count() as f64;
        let length_ratio = query.chars().count() as f64 / text_len;
        let position_score = 1.0 - position / text_len;
        return CONTAINMENT_BASE
            + length_ratio * CONTAINMENT_LENGTH_WEIGHT
            + position_score * CONTAINMENT_POSITION_WEIGHT;
    }

    let query_words: Vec<&str> = query.split_whitespace().collect();
    let text_words: Vec<&str> = text.split_whitespace().collect();

    let mut total_score = 0.0;
    let mut matches = 0;

    for query_word in &query_words {
        let best_score = text_words
            .iter()
            .map(|text_word| word_similarity(query_word, text_word))
            .fold(0.0_f64, f64::max);

        if best_score > WORD_MATCH_THRESHOLD {
            total_score += best_score;
            matches += 1;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    (total_score / query_words.len() as f64) * FUZZY_FALLBACK_SCALE
}
