//! Semantic reranking by embedding similarity.

use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::error::{Result, SearchError};
use crate::models::{RankedSnippet, Snippet};

/// Round to 4 decimal places.
fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Embed `query` and every snippet, then return the `top_n` snippets most
/// similar to the query, best first.
///
/// Scores are cosine similarities rounded to 4 decimals. A zero-norm
/// embedding scores `0.0`. Ties keep input order. An empty input returns an
/// empty list without touching the provider.
///
/// # Errors
///
/// [`SearchError::ModelUnavailable`] if the provider fails, and
/// [`SearchError::EmbeddingMismatch`] if it returns the wrong number of
/// vectors.
pub fn semantic_rerank(
    provider: &dyn EmbeddingProvider,
    snippets: Vec<Snippet>,
    query: &str,
    top_n: usize,
) -> Result<Vec<RankedSnippet>> {
    if snippets.is_empty() || top_n == 0 {
        return Ok(Vec::new());
    }

    let query_vec = embed_query(provider, query).map_err(into_unavailable)?;
    let texts: Vec<String> = snippets.iter().map(|s| s.code.clone()).collect();
    let code_vecs = provider.embed(&texts).map_err(into_unavailable)?;

    if code_vecs.len() != snippets.len() {
        return Err(SearchError::EmbeddingMismatch {
            expected: snippets.len(),
            got: code_vecs.len(),
        });
    }

    let mut ranked: Vec<(Snippet, f64)> = snippets
        .into_iter()
        .zip(code_vecs.iter())
        .map(|(s, v)| (s, cosine_similarity(v, &query_vec) as f64))
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_n);

    tracing::debug!(
        model = provider.model_name(),
        kept = ranked.len(),
        "semantic rerank applied"
    );

    Ok(ranked
        .into_iter()
        .map(|(s, score)| RankedSnippet {
            path: s.path,
            code: s.code,
            score: round4(score).clamp(-1.0, 1.0),
        })
        .collect())
}

/// Provider failures surface as `ModelUnavailable`; a count mismatch keeps
/// its own kind.
fn into_unavailable(err: SearchError) -> SearchError {
    match err {
        SearchError::ModelUnavailable(_) | SearchError::EmbeddingMismatch { .. } => err,
        other => SearchError::ModelUnavailable(other.to_string()),
    }
}
