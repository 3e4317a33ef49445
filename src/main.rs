//! # Codebase Search CLI (`cbs`)
//!
//! ## Usage
//!
//! ```bash
//! cbs [--config ./cbs.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cbs search "<query>"` | Keyword collection, BM25 filter, semantic rerank |
//! | `cbs lexical "<query>"` | Keyword collection and BM25 filter only |
//! | `cbs grep "<query>"` | Keyword-collected snippets, unranked |
//! | `cbs collect` | Whole-tree snippets, unranked |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (e.g. `RUST_LOG=codebase_search=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use codebase_search::{collect_cmd, config, search};

/// Codebase Search CLI: two-stage semantic search over a source tree.
#[derive(Parser)]
#[command(
    name = "cbs",
    about = "Codebase Search: keyword collection, BM25 filtering, and embedding rerank",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a source tree and print the most similar snippets.
    Search {
        /// The search query string.
        query: String,

        /// Directory to search.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Only include files matching these globs (repeatable). Default: all.
        #[arg(long = "glob")]
        globs: Vec<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        top_n: Option<usize>,

        /// Candidate strategy: `keyword` (search tool) or `tree` (chunk every file).
        #[arg(long)]
        strategy: Option<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Keyword-collect and rank by BM25 only. Does not load a model.
    Lexical {
        query: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long = "glob")]
        globs: Vec<String>,
        #[arg(long)]
        top_n: Option<usize>,
        #[arg(long)]
        json: bool,
    },

    /// Print keyword-collected snippets without ranking.
    Grep {
        query: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long = "glob")]
        globs: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// Chunk every recognized file under the root and print the snippets.
    Collect {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Override `collector.max_chars_per_chunk`.
        #[arg(long)]
        max_chars: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Search {
            query,
            root,
            globs,
            top_n,
            strategy,
            json,
        } => {
            search::run_search(&cfg, &query, &root, &globs, top_n, strategy.as_deref(), json)?;
        }
        Commands::Lexical {
            query,
            root,
            globs,
            top_n,
            json,
        } => {
            collect_cmd::run_lexical(&cfg, &query, &root, &globs, top_n, json)?;
        }
        Commands::Grep {
            query,
            root,
            globs,
            json,
        } => {
            collect_cmd::run_grep(&cfg, &query, &root, &globs, json)?;
        }
        Commands::Collect {
            root,
            max_chars,
            json,
        } => {
            collect_cmd::run_collect(&cfg, &root, max_chars, json)?;
        }
    }

    Ok(())
}
