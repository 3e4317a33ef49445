//! BM25 Okapi lexical ranking.
//!
//! Documents and queries are tokenized by lowercasing and splitting on
//! whitespace. Scoring uses the conventional constants `k1 = 1.5` and
//! `b = 0.75`. Terms whose raw IDF is negative (present in more than half
//! of the corpus) get `epsilon × average_idf` instead.
//!
//! ```text
//! idf(q)      = ln(N - n(q) + 0.5) - ln(n(q) + 0.5)
//! score(D, Q) = Σ idf(q) · tf(q, D) · (k1 + 1)
//!                        / (tf(q, D) + k1 · (1 - b + b · |D| / avgdl))
//! ```

use std::collections::HashMap;

use crate::models::Snippet;

pub const K1: f64 = 1.5;
pub const B: f64 = 0.75;
pub const EPSILON: f64 = 0.25;

/// Lowercase and split on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Term statistics for a fixed corpus.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn new(corpus: &[Vec<String>]) -> Self {
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut containing: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in doc {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *containing.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lens.push(doc.len());
            doc_freqs.push(freqs);
        }

        let total_len: usize = doc_lens.iter().sum();
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f64 / corpus.len() as f64
        };

        let n_docs = corpus.len() as f64;
        let mut idf: HashMap<String, f64> = HashMap::with_capacity(containing.len());
        let mut idf_sum = 0.0;
        let mut negative: Vec<String> = Vec::new();
        for (term, n) in containing {
            let n = n as f64;
            let value = (n_docs - n + 0.5).ln() - (n + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }

        if !idf.is_empty() {
            let floor = EPSILON * (idf_sum / idf.len() as f64);
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            doc_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    /// One score per document, in corpus order.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.len()];
        if self.avgdl <= 0.0 {
            return scores;
        }

        for term in query {
            let Some(&idf) = self.idf.get(term) else {
                continue;
            };
            for (i, freqs) in self.doc_freqs.iter().enumerate() {
                let tf = freqs.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let norm = 1.0 - B + B * self.doc_lens[i] as f64 / self.avgdl;
                scores[i] += idf * (tf * (K1 + 1.0)) / (tf + K1 * norm);
            }
        }
        scores
    }
}

/// Keep the `top_n` snippets with the highest BM25 score for `query`.
///
/// Ties keep collection order. An empty input yields an empty output.
pub fn bm25_filter(snippets: Vec<Snippet>, query: &str, top_n: usize) -> Vec<Snippet> {
    if snippets.is_empty() {
        return snippets;
    }

    let corpus: Vec<Vec<String>> = snippets.iter().map(|s| tokenize(&s.code)).collect();
    let index = Bm25Index::new(&corpus);
    let scores = index.scores(&tokenize(query));

    let mut ranked: Vec<(Snippet, f64)> = snippets.into_iter().zip(scores).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(top_n);

    tracing::debug!(kept = ranked.len(), "bm25 filter applied");
    ranked.into_iter().map(|(s, _)| s).collect()
}
