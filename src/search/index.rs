// Search index module for the help desk search engine
// In-memory corpus of bilingual articles and the linear-scan query engine

use serde::{Deserialize, Deserializer, Serialize};

use super::fuzzy::fuzzy_match;
use super::snippet::{Snippet, SnippetBuilder};

/// Weight of the title match in a document score
const TITLE_WEIGHT: f64 = 3.0;
/// Weight of the content match
const CONTENT_WEIGHT: f64 = 1.5;
/// Weight applied to the sum of keyword matches
const KEYWORD_WEIGHT: f64 = 2.0;

/// Snippets attached to each search result
const RESULT_SNIPPETS: usize = 2;
/// Nominal snippet length in characters
const RESULT_SNIPPET_LENGTH: usize = 150;

/// Default minimum score of a result
pub const DEFAULT_MIN_SCORE: f64 = 0.1;
/// Default result page size
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Language the user is browsing in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    /// Two-letter code (`en` | `es`)
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// Parse an exact language code, rejecting anything else
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    /// Pick a language from a locale string such as `es-MX` or `en_US.UTF-8`
    pub fn from_locale(locale: &str) -> Self {
        if locale.trim().to_lowercase().starts_with("es") {
            Language::Es
        } else {
            Language::En
        }
    }
}

/// Language a document is published in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentLanguage {
    En,
    Es,
    /// Language-agnostic, shown in every language
    Both,
}

impl DocumentLanguage {
    /// Whether the document is visible when browsing in `language`
    pub fn matches(self, language: Language) -> bool {
        match self {
            DocumentLanguage::Both => true,
            DocumentLanguage::En => language == Language::En,
            DocumentLanguage::Es => language == Language::Es,
        }
    }
}

/// One help article
/// English fields are mandatory; the Spanish ones overlay them when present
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub language: DocumentLanguage,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_es: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_es: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_es: Option<Vec<String>>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_es: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// Text fields of a document in one language
#[derive(Debug, Clone, Copy)]
pub struct LocalizedFields<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub keywords: &'a [String],
}

fn overlay<'a>(spanish: Option<&'a str>, english: &'a str) -> &'a str {
    spanish.filter(|text| !text.is_empty()).unwrap_or(english)
}

impl Document {
    /// Language-appropriate fields, falling back to English field by field
    pub fn localized(&self, language: Language) -> LocalizedFields<'_> {
        match language {
            Language::En => LocalizedFields {
                title: &self.title,
                content: &self.content,
                keywords: &self.keywords,
            },
            Language::Es => LocalizedFields {
                title: overlay(self.title_es.as_deref(), &self.title),
                content: overlay(self.content_es.as_deref(), &self.content),
                keywords: self.keywords_es.as_deref().unwrap_or(&self.keywords),
            },
        }
    }

    /// Whether either category identifier equals `category`
    pub fn in_category(&self, category: &str) -> bool {
        self.category == category || self.category_es.as_deref() == Some(category)
    }
}

/// Category metadata, used only for display labels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_es: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_es: Option<String>,
}

/// Category with its labels resolved for one language
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: String,
    pub display_name: String,
    pub display_description: String,
}

impl Category {
    pub fn view(&self, language: Language) -> CategoryView {
        let (name, description) = match language {
            Language::En => (self.name.as_str(), self.description.as_str()),
            Language::Es => (
                overlay(self.name_es.as_deref(), &self.name),
                overlay(self.description_es.as_deref(), &self.description),
            ),
        };

        CategoryView {
            id: self.id.clone(),
            display_name: name.to_string(),
            display_description: description.to_string(),
        }
    }
}

/// Search options, every field optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    /// Only documents whose `category` or `categoryEs` equals this
    /// An empty string means no filter
    pub category: Option<String>,
    /// Search language; the engine substitutes its current language when unset
    pub language: Option<Language>,
    /// Results scoring below this are dropped (`null` means the default)
    #[serde(deserialize_with = "min_score_or_default")]
    pub min_score: f64,
    /// Result page size (`null` means the default)
    #[serde(deserialize_with = "max_results_or_default")]
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            category: None,
            language: None,
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl SearchOptions {
    /// Category filter, `None` when unset or blank
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
    }
}

fn min_score_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_MIN_SCORE))
}

fn max_results_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or(DEFAULT_MAX_RESULTS))
}

/// Search result: the matched document plus its score and localized view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(flatten)]
    pub document: Document,
    pub score: f64,
    pub snippets: Vec<Snippet>,
    pub display_title: String,
    pub display_content: String,
}

/// Weighted relevance of a document's localized fields for `query`
pub fn score_fields(query: &str, fields: &LocalizedFields<'_>) -> f64 {
    let title_score = fuzzy_match(query, fields.title) * TITLE_WEIGHT;
    let content_score = fuzzy_match(query, fields.content) * CONTENT_WEIGHT;
    let keyword_score = fields
        .keywords
        .iter()
        .map(|keyword| fuzzy_match(query, keyword))
        .sum::<f64>()
        * KEYWORD_WEIGHT;

    title_score + content_score + keyword_score
}

/// Read-only corpus: documents plus category metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchIndex {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    categories: Vec<Category>,
}

impl SearchIndex {
    /// Create a new empty search index
    pub fn new() -> Self {
        SearchIndex::default()
    }

    pub fn from_parts(documents: Vec<Document>, categories: Vec<Category>) -> Self {
        SearchIndex {
            documents,
            categories,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Get number of documents in index
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a category by id
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Categories with labels resolved for `language`
    pub fn category_views(&self, language: Language) -> Vec<CategoryView> {
        self.categories
            .iter()
            .map(|category| category.view(language))
            .collect()
    }

    /// Rank every visible document against `query`
    ///
    /// Scans the whole corpus; documents outside the language or category
    /// filter are skipped, the rest are kept when their weighted score reaches
    /// `min_score`. Results are ordered by descending score (stable for ties)
    /// and cut to `max_results`. An unset language means English.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        if query.trim().is_empty() || self.documents.is_empty() || options.max_results == 0 {
            return Vec::new();
        }

        let language = options.language.unwrap_or_default();
        let snippet_builder = SnippetBuilder::new(query);
        let mut results = Vec::new();

        for doc in &self.documents {
            if !doc.language.matches(language) {
                continue;
            }

            if let Some(category) = options.category_filter() {
                if !doc.in_category(category) {
                    continue;
                }
            }

            let fields = doc.localized(language);
            let score = score_fields(query, &fields);

            if score >= options.min_score {
                results.push(SearchResult {
                    document: doc.clone(),
                    score,
                    snippets: snippet_builder.build(
                        fields.content,
                        RESULT_SNIPPETS,
                        RESULT_SNIPPET_LENGTH,
                    ),
                    display_title: fields.title.to_string(),
                    display_content: fields.content.to_string(),
                });
            }
        }

        // Sort by score (descending) to return most relevant results first
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(options.max_results);
        results
    }
}
