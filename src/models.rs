//! Core data models used throughout the search pipeline.
//!
//! Snippets flow from the collectors through the BM25 filter into the
//! semantic reranker, which turns them into [`RankedSnippet`]s.

use serde::Serialize;

/// A labeled piece of source text, the unit of retrieval.
///
/// `code` is never empty: collectors drop empty and whitespace-only chunks.
/// `score` stays `None` until the snippet has been reranked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub path: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Snippet {
    pub fn new(path: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            score: None,
        }
    }
}

/// A search result, most similar first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSnippet {
    /// Filesystem location the text was extracted from.
    pub path: String,
    /// Snippet text.
    pub code: String,
    /// Cosine similarity to the query, rounded to 4 decimals, in `[-1, 1]`.
    pub score: f64,
}

impl From<RankedSnippet> for Snippet {
    fn from(r: RankedSnippet) -> Self {
        Self {
            path: r.path,
            code: r.code,
            score: Some(r.score),
        }
    }
}
