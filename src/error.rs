//! Error type for the search pipeline.
//!
//! Library functions return [`SearchError`]; the `cbs` binary converts to
//! `anyhow::Error` at the boundary. Collection failures that are best-effort
//! by nature (unreadable files, a failing search tool) never surface here.

/// Errors that can occur while collecting, filtering, or reranking snippets.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A caller-supplied glob could not be compiled.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A keyword pattern could not be compiled by the native searcher.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The embedding model could not be loaded or failed to embed.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// The provider returned a different number of vectors than inputs.
    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    EmbeddingMismatch { expected: usize, got: usize },

    /// A remote embedding API returned an error or malformed payload.
    #[error("embedding request failed: {0}")]
    Embedding(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
