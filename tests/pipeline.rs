use std::fs;
use std::path::Path;

use codebase_search::bm25::bm25_filter;
use codebase_search::embedding::EmbeddingProvider;
use codebase_search::error::Result;
use codebase_search::exclude::ExclusionSet;
use codebase_search::keyword::NativeSearcher;
use codebase_search::rerank::semantic_rerank;
use codebase_search::search::search_codebase;
use codebase_search::{SearchEngine, Snippet};
use tempfile::TempDir;

/// Maps text onto a few hand-picked concepts by substring.
struct ConceptEmbedder;

const CONCEPTS: &[&str] = &["add", "sub", "image", "token"];

impl EmbeddingProvider for ConceptEmbedder {
    fn model_name(&self) -> &str {
        "concept"
    }

    fn dims(&self) -> usize {
        CONCEPTS.len()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                CONCEPTS
                    .iter()
                    .map(|c| if t.contains(c) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn sample_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    write(
        root,
        "src/images.py",
        "def load_image(path):\n    return read(path)\n\n\ndef resize_image(img):\n    return img\n",
    );
    write(
        root,
        "src/auth.py",
        "def issue_token(user):\n    return sign(user)\n",
    );
    write(root, "docs/images.md", "# Images\n\nEvery image is resized on upload.\n");
    write(root, "node_modules/lib/image.js", "export const image = 1;\n");
    write(root, "venv/lib/image.py", "image = None\n");
    write(root, "assets/logo.png", "image bytes");

    tmp
}

fn engine() -> SearchEngine {
    SearchEngine::new(Box::new(NativeSearcher::default()), Box::new(ConceptEmbedder))
}

#[test]
fn test_addition_ranks_above_subtraction() {
    let corpus = vec![
        Snippet::new("a.py", "def add(x,y): return x+y"),
        Snippet::new("b.py", "def sub(x,y): return x-y"),
    ];

    let filtered = bm25_filter(corpus, "addition function", 2);
    assert_eq!(filtered.len(), 2);

    let ranked = semantic_rerank(&ConceptEmbedder, filtered, "addition function", 2).unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].path, "a.py");
    assert_eq!(ranked[1].path, "b.py");
    assert!(ranked[0].score > ranked[1].score);
}

#[test]
fn test_exclusions_never_leak() {
    let repo = sample_repo();

    let results = engine()
        .search_codebase("image", repo.path(), &[], 50)
        .unwrap();
    assert!(!results.is_empty());

    let exclusions = ExclusionSet::default();
    for r in &results {
        assert!(!exclusions.is_excluded(&r.path), "excluded path returned: {}", r.path);
    }
}

#[test]
fn test_results_non_empty_and_sorted() {
    let repo = sample_repo();

    let results = engine()
        .search_codebase("image token", repo.path(), &[], 50)
        .unwrap();
    assert!(!results.is_empty());
    for r in &results {
        assert!(!r.code.is_empty());
    }
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_md_glob_yields_only_markdown() {
    let repo = sample_repo();

    let results = engine()
        .search_codebase("image", repo.path(), &["*.md".to_string()], 50)
        .unwrap();
    assert!(!results.is_empty());
    for r in &results {
        assert!(r.path.ends_with(".md"), "unexpected path: {}", r.path);
    }
}

#[test]
fn test_top_one() {
    let repo = sample_repo();

    let results = engine()
        .search_codebase("token", repo.path(), &[], 1)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("auth.py"));
}

#[test]
fn test_unmatched_query_is_empty() {
    let repo = sample_repo();

    let results = search_codebase(
        Box::new(ConceptEmbedder),
        "qwertyzxcv",
        repo.path(),
        &[],
        10,
    )
    .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_monotonic_narrowing() {
    let repo = sample_repo();
    let engine = engine();

    let collected = engine.collect_tree(repo.path());
    let n = collected.len();
    assert!(n > 2);

    let filtered = bm25_filter(collected, "image", 3);
    assert!(filtered.len() <= n);
    assert!(filtered.len() <= 3);

    let filtered_len = filtered.len();
    let ranked = semantic_rerank(&ConceptEmbedder, filtered, "image", 2).unwrap();
    assert!(ranked.len() <= filtered_len);
    assert!(ranked.len() <= 2);
}

#[test]
fn test_tree_strategy_skips_excluded_and_unknown_files() {
    let repo = sample_repo();

    let results = engine().search_tree("image", repo.path(), 50).unwrap();
    assert!(!results.is_empty());
    for r in &results {
        assert!(!r.path.contains("node_modules"));
        assert!(!r.path.contains("/venv/"));
        assert!(!r.path.ends_with(".png"));
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[test]
#[ignore = "downloads the embedding model"]
fn test_local_model_prefers_addition() {
    use codebase_search::config::EmbeddingConfig;
    use codebase_search::embedding::create_provider;

    let provider = create_provider(&EmbeddingConfig::default()).unwrap();
    let corpus = vec![
        Snippet::new("a.py", "def add(x,y): return x+y"),
        Snippet::new("b.py", "def sub(x,y): return x-y"),
    ];

    let ranked = semantic_rerank(provider.as_ref(), corpus, "addition function", 2).unwrap();
    assert_eq!(ranked[0].path, "a.py");
}
