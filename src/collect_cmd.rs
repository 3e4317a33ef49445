//! CLI commands that stop before the embedding step.
//!
//! - `cbs collect` prints whole-tree snippets.
//! - `cbs grep` prints keyword-strategy snippets.
//! - `cbs lexical` prints keyword-strategy snippets ranked by BM25.
//!
//! None of these load an embedding model.

use anyhow::{bail, Result};
use std::path::Path;

use crate::bm25::bm25_filter;
use crate::config::Config;
use crate::connector_fs::TreeCollector;
use crate::connector_keyword::KeywordCollector;
use crate::keyword::create_searcher;
use crate::models::Snippet;

pub fn run_collect(
    config: &Config,
    root: &Path,
    max_chars: Option<usize>,
    json: bool,
) -> Result<()> {
    ensure_root(root)?;
    let max_chars = max_chars.unwrap_or(config.collector.max_chars_per_chunk);
    if max_chars == 0 {
        bail!("--max-chars must be > 0");
    }

    let collector = TreeCollector::new(
        config.collector.exclusion_set(),
        config.collector.extensions.clone(),
    );
    let snippets = collector.collect_code_snippets(root, max_chars);
    print_snippets(&snippets, json)
}

pub fn run_grep(
    config: &Config,
    query: &str,
    root: &Path,
    globs: &[String],
    json: bool,
) -> Result<()> {
    let snippets = keyword_candidates(config, query, root, globs)?;
    print_snippets(&snippets, json)
}

pub fn run_lexical(
    config: &Config,
    query: &str,
    root: &Path,
    globs: &[String],
    top_n: Option<usize>,
    json: bool,
) -> Result<()> {
    let snippets = keyword_candidates(config, query, root, globs)?;
    let top_n = top_n.unwrap_or(config.retrieval.candidate_k);
    let ranked = bm25_filter(snippets, query, top_n);
    print_snippets(&ranked, json)
}

fn keyword_candidates(
    config: &Config,
    query: &str,
    root: &Path,
    globs: &[String],
) -> Result<Vec<Snippet>> {
    ensure_root(root)?;
    let searcher = create_searcher(&config.keyword)?;
    let exclusions = config.collector.exclusion_set();
    let collector = KeywordCollector::new(
        searcher.as_ref(),
        &exclusions,
        config.collector.context_lines,
    );
    let snippets = collector.keyword_snippets(query, root, globs)?;
    Ok(snippets)
}

fn ensure_root(root: &Path) -> Result<()> {
    if !root.exists() {
        bail!("Search root does not exist: {}", root.display());
    }
    Ok(())
}

fn print_snippets(snippets: &[Snippet], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snippets)?);
        return Ok(());
    }

    if snippets.is_empty() {
        println!("No snippets.");
        return Ok(());
    }

    for (i, snippet) in snippets.iter().enumerate() {
        println!("{}. {}", i + 1, snippet.path);
        for line in snippet.code.lines() {
            println!("    {}", line);
        }
        println!();
    }
    println!("snippets: {}", snippets.len());
    Ok(())
}
