// Corpus loading for the help desk search engine
// The corpus is one JSON document `{ documents, categories }` fetched once

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use super::index::SearchIndex;
use crate::error::Result;

/// Where the corpus JSON comes from
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusSource {
    /// Inline JSON text
    Json(String),
    /// JSON file on disk
    File(PathBuf),
    /// JSON resource fetched over HTTP(S)
    Url(String),
}

impl fmt::Display for CorpusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusSource::Json(data) => write!(f, "inline JSON ({} bytes)", data.len()),
            CorpusSource::File(path) => write!(f, "{}", path.display()),
            CorpusSource::Url(url) => write!(f, "{}", url),
        }
    }
}

impl CorpusSource {
    /// Interpret a location string: an `http(s)://` URL, inline JSON, or a file path
    pub fn from_location(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            CorpusSource::Url(trimmed.to_string())
        } else if trimmed.starts_with('{') {
            CorpusSource::Json(trimmed.to_string())
        } else {
            CorpusSource::File(PathBuf::from(trimmed))
        }
    }

    /// Fetch and parse the corpus
    pub async fn fetch(&self) -> Result<SearchIndex> {
        match self {
            CorpusSource::Json(data) => Ok(serde_json::from_str(data)?),
            CorpusSource::File(path) => {
                let data = tokio::fs::read_to_string(path).await?;
                Ok(serde_json::from_str(&data)?)
            }
            CorpusSource::Url(url) => {
                let index = reqwest::get(url)
                    .await?
                    .error_for_status()?
                    .json::<SearchIndex>()
                    .await?;
                Ok(index)
            }
        }
    }

    /// Fetch the corpus, substituting an empty one on any failure
    pub async fn fetch_or_empty(&self) -> SearchIndex {
        match self.fetch().await {
            Ok(index) => {
                info!(
                    "Loaded corpus from {}: {} documents, {} categories",
                    self,
                    index.len(),
                    index.categories().len()
                );
                index
            }
            Err(e) => {
                warn!("Failed to load corpus from {}: {}", self, e);
                SearchIndex::new()
            }
        }
    }
}
