use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::exclude::{ExclusionSet, DEFAULT_EXCLUDE};

/// Largest accepted `collector.context_lines`.
pub const MAX_CONTEXT_LINES: usize = 1000;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub keyword: KeywordConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub extra_exclude: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_max_chars")]
    pub max_chars_per_chunk: usize,
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            extra_exclude: Vec::new(),
            extensions: default_extensions(),
            max_chars_per_chunk: default_max_chars(),
            context_lines: default_context_lines(),
        }
    }
}

impl CollectorConfig {
    pub fn exclusion_set(&self) -> ExclusionSet {
        let mut set = ExclusionSet::new(self.exclude.iter().cloned());
        set.extend(self.extra_exclude.iter().cloned());
        set
    }
}

fn default_exclude() -> Vec<String> {
    DEFAULT_EXCLUDE.iter().map(|p| p.to_string()).collect()
}
fn default_extensions() -> Vec<String> {
    ["py", "ts", "js", "tsx", "jsx", "go", "md", "prisma", "rs"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}
fn default_max_chars() -> usize {
    600
}
fn default_context_lines() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordConfig {
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            timeout_secs: default_search_timeout(),
            max_line_len: default_max_line_len(),
        }
    }
}

impl KeywordConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_tool() -> String {
    "ag".to_string()
}
fn default_search_timeout() -> u64 {
    30
}
fn default_max_line_len() -> usize {
    250
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            candidate_k: default_candidate_k(),
            top_n: default_top_n(),
        }
    }
}

fn default_strategy() -> String {
    "keyword".to_string()
}
fn default_candidate_k() -> usize {
    50
}
fn default_top_n() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// Load and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if given, otherwise fall back to defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => Ok(Config::default()),
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.collector.max_chars_per_chunk == 0 {
        anyhow::bail!("collector.max_chars_per_chunk must be > 0");
    }
    if config.collector.context_lines > MAX_CONTEXT_LINES {
        anyhow::bail!("collector.context_lines must be <= {}", MAX_CONTEXT_LINES);
    }

    if config.retrieval.candidate_k < 1 {
        anyhow::bail!("retrieval.candidate_k must be >= 1");
    }
    if config.retrieval.top_n < 1 {
        anyhow::bail!("retrieval.top_n must be >= 1");
    }

    match config.retrieval.strategy.as_str() {
        "keyword" | "tree" => {}
        other => anyhow::bail!(
            "Unknown retrieval strategy: '{}'. Must be keyword or tree.",
            other
        ),
    }

    match config.keyword.tool.as_str() {
        "ag" | "rg" | "native" => {}
        other => anyhow::bail!(
            "Unknown keyword search tool: '{}'. Must be ag, rg, or native.",
            other
        ),
    }

    if config.keyword.timeout_secs == 0 {
        anyhow::bail!("keyword.timeout_secs must be > 0");
    }

    match config.embedding.provider.as_str() {
        "local" | "ollama" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, or openai.",
            other
        ),
    }

    if config.embedding.provider != "local" {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    Ok(())
}
