//! # Codebase Search
//!
//! Two-stage semantic search over a source tree.
//!
//! A query first narrows the tree to candidate snippets (keyword search or
//! whole-tree chunking), BM25 keeps the most lexically relevant candidates,
//! and an embedding model reranks the survivors by cosine similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────┐   ┌──────────────┐
//! │  Collector  │──▶│   BM25   │──▶│   Semantic   │──▶ ranked snippets
//! │ keyword/tree│   │  top-K   │   │ rerank top-N │
//! └─────────────┘   └──────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cbs search "token image" --root ./src
//! cbs search "auth flow" --root . --glob "*.md" --top-n 5
//! cbs collect --root ./src           # whole-tree snippets
//! cbs lexical "parse config" --root . # BM25 only, no model
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Snippet types |
//! | [`exclude`] | Substring path exclusion |
//! | [`chunk`] | Blank-line chunking and line runs |
//! | [`keyword`] | Keyword searchers (`ag`, `rg`, native) |
//! | [`connector_fs`] | Whole-tree collector |
//! | [`connector_keyword`] | Keyword-search collector |
//! | [`bm25`] | Lexical filter |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`rerank`] | Semantic reranker |
//! | [`search`] | Search façade |

pub mod bm25;
pub mod chunk;
pub mod collect_cmd;
pub mod config;
pub mod connector_fs;
pub mod connector_keyword;
pub mod embedding;
pub mod error;
pub mod exclude;
pub mod keyword;
pub mod models;
pub mod rerank;
pub mod search;

pub use error::SearchError;
pub use models::{RankedSnippet, Snippet};
pub use search::SearchEngine;
