//! Two-stage codebase search.
//!
//! [`SearchEngine`] composes the pipeline:
//!
//! 1. Collect candidate snippets (keyword search or whole-tree chunking).
//! 2. Keep the `candidate_k` best by BM25.
//! 3. Rerank those by embedding similarity and return the `top_n` best.
//!
//! Embedding every snippet of a large repository is slow; BM25 cheaply
//! narrows the field before the embedding step runs.

use anyhow::{bail, Result as AnyResult};
use std::path::Path;

use crate::bm25::bm25_filter;
use crate::config::{CollectorConfig, Config, RetrievalConfig};
use crate::connector_fs::TreeCollector;
use crate::connector_keyword::KeywordCollector;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::Result;
use crate::exclude::ExclusionSet;
use crate::keyword::{create_searcher, KeywordSearcher, NativeSearcher};
use crate::models::{RankedSnippet, Snippet};

pub struct SearchEngine {
    searcher: Box<dyn KeywordSearcher>,
    provider: Box<dyn EmbeddingProvider>,
    exclusions: ExclusionSet,
    tree: TreeCollector,
    max_chars_per_chunk: usize,
    context_lines: usize,
    candidate_k: usize,
}

impl SearchEngine {
    /// Engine with default exclusions and limits.
    pub fn new(searcher: Box<dyn KeywordSearcher>, provider: Box<dyn EmbeddingProvider>) -> Self {
        let defaults = CollectorConfig::default();
        let exclusions = defaults.exclusion_set();
        Self {
            searcher,
            provider,
            tree: TreeCollector::new(exclusions.clone(), defaults.extensions),
            exclusions,
            max_chars_per_chunk: defaults.max_chars_per_chunk,
            context_lines: defaults.context_lines,
            candidate_k: RetrievalConfig::default().candidate_k,
        }
    }

    /// Build the searcher and embedding provider named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let searcher = create_searcher(&config.keyword)?;
        let provider = create_provider(&config.embedding)?;
        let exclusions = config.collector.exclusion_set();
        Ok(Self {
            searcher,
            provider,
            tree: TreeCollector::new(exclusions.clone(), config.collector.extensions.clone()),
            exclusions,
            max_chars_per_chunk: config.collector.max_chars_per_chunk,
            context_lines: config.collector.context_lines,
            candidate_k: config.retrieval.candidate_k,
        })
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.tree = TreeCollector::new(exclusions.clone(), self.tree.extensions().to_vec());
        self.exclusions = exclusions;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.tree = TreeCollector::new(self.exclusions.clone(), extensions);
        self
    }

    pub fn with_candidate_k(mut self, candidate_k: usize) -> Self {
        self.candidate_k = candidate_k;
        self
    }

    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn with_max_chars(mut self, max_chars_per_chunk: usize) -> Self {
        self.max_chars_per_chunk = max_chars_per_chunk;
        self
    }

    /// Keyword-strategy candidates, unranked.
    pub fn collect_keyword(
        &self,
        query: &str,
        base_dir: &Path,
        globs: &[String],
    ) -> Result<Vec<Snippet>> {
        KeywordCollector::new(self.searcher.as_ref(), &self.exclusions, self.context_lines)
            .keyword_snippets(query, base_dir, globs)
    }

    /// Whole-tree candidates, unranked.
    pub fn collect_tree(&self, base_dir: &Path) -> Vec<Snippet> {
        self.tree.collect_code_snippets(base_dir, self.max_chars_per_chunk)
    }

    /// Search `base_dir` for `query` using keyword collection, BM25, and
    /// semantic reranking. Returns at most `top_n` results, best first.
    ///
    /// No matches (including a failing search tool) yields `Ok(vec![])`.
    pub fn search_codebase(
        &self,
        query: &str,
        base_dir: &Path,
        globs: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedSnippet>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let snippets = self.collect_keyword(query, base_dir, globs)?;
        self.rank(snippets, query, top_n)
    }

    /// Same pipeline, but candidates come from whole-tree chunking.
    pub fn search_tree(
        &self,
        query: &str,
        base_dir: &Path,
        top_n: usize,
    ) -> Result<Vec<RankedSnippet>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let snippets = self.collect_tree(base_dir);
        self.rank(snippets, query, top_n)
    }

    fn rank(
        &self,
        snippets: Vec<Snippet>,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<RankedSnippet>> {
        if snippets.is_empty() {
            tracing::info!("no candidate snippets");
            return Ok(Vec::new());
        }
        let collected = snippets.len();
        let filtered = bm25_filter(snippets, query, self.candidate_k);
        tracing::info!(collected, filtered = filtered.len(), "lexical filter done");
        crate::rerank::semantic_rerank(self.provider.as_ref(), filtered, query, top_n)
    }
}

/// Convenience for in-process callers: native keyword search plus the
/// given provider, default limits.
pub fn search_codebase(
    provider: Box<dyn EmbeddingProvider>,
    query: &str,
    base_dir: &Path,
    globs: &[String],
    top_n: usize,
) -> Result<Vec<RankedSnippet>> {
    SearchEngine::new(Box::new(NativeSearcher::default()), provider)
        .search_codebase(query, base_dir, globs, top_n)
}

/// CLI entry point for `cbs search`.
pub fn run_search(
    config: &Config,
    query: &str,
    root: &Path,
    globs: &[String],
    top_n: Option<usize>,
    strategy: Option<&str>,
    json: bool,
) -> AnyResult<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    if !root.exists() {
        bail!("Search root does not exist: {}", root.display());
    }

    let strategy = strategy.unwrap_or(config.retrieval.strategy.as_str());
    let top_n = top_n.unwrap_or(config.retrieval.top_n);
    let engine = SearchEngine::from_config(config)?;

    let results = match strategy {
        "keyword" => engine.search_codebase(query, root, globs, top_n)?,
        "tree" => engine.search_tree(query, root, top_n)?,
        other => bail!("Unknown retrieval strategy: {}. Use keyword or tree.", other),
    };

    print_ranked(&results, json)
}

pub fn print_ranked(results: &[RankedSnippet], json: bool) -> AnyResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.4}] {}", i + 1, result.score, result.path);
        for line in result.code.lines() {
            println!("    {}", line);
        }
        println!();
    }
    Ok(())
}
