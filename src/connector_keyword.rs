//! Keyword-search-based collector.
//!
//! Runs a [`KeywordSearcher`] for the query words, widens every hit to a
//! window of surrounding lines, and rebuilds one snippet per contiguous run
//! of collected lines. Only files matching a caller glob are kept.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::chunk::contiguous_runs;
use crate::error::{Result, SearchError};
use crate::exclude::ExclusionSet;
use crate::keyword::{query_pattern, KeywordMatch, KeywordSearcher};
use crate::models::Snippet;

pub struct KeywordCollector<'a> {
    searcher: &'a dyn KeywordSearcher,
    exclusions: &'a ExclusionSet,
    context_lines: usize,
}

impl<'a> KeywordCollector<'a> {
    pub fn new(
        searcher: &'a dyn KeywordSearcher,
        exclusions: &'a ExclusionSet,
        context_lines: usize,
    ) -> Self {
        Self {
            searcher,
            exclusions,
            context_lines,
        }
    }

    /// Collect snippets around lines matching any word of `query`.
    ///
    /// Returns an empty list for a blank query or when the searcher finds
    /// nothing. Files that cannot be re-read are skipped.
    pub fn keyword_snippets(
        &self,
        query: &str,
        root: &Path,
        globs: &[String],
    ) -> Result<Vec<Snippet>> {
        let include = build_globset(globs)?;
        let Some(pattern) = query_pattern(query) else {
            return Ok(Vec::new());
        };

        let matches = self.searcher.find(&pattern, root, self.exclusions)?;
        tracing::debug!(
            searcher = self.searcher.name(),
            matches = matches.len(),
            "keyword search finished"
        );

        let mut snippets = Vec::new();

        for (path, hits) in group_by_file(&matches) {
            let path_str = path.to_string_lossy().to_string();
            if self.exclusions.is_excluded(&path_str) {
                continue;
            }
            if let Some(set) = &include {
                if !set.is_match(&path_str) {
                    continue;
                }
            }

            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes);
            let file_lines: Vec<&str> = content.lines().collect();

            let lines: Vec<usize> = self
                .window_lines(&hits, file_lines.len())
                .into_iter()
                .collect();

            for (start, end) in contiguous_runs(&lines) {
                let code = file_lines[start - 1..end].join("\n");
                if code.trim().is_empty() {
                    continue;
                }
                snippets.push(Snippet::new(path_str.clone(), code));
            }
        }

        tracing::info!(
            root = %root.display(),
            snippets = snippets.len(),
            "collected keyword snippets"
        );
        Ok(snippets)
    }

    /// Sorted line numbers within `context_lines` of any hit, clamped to
    /// `[1, file_len]`.
    fn window_lines(&self, hits: &[usize], file_len: usize) -> BTreeSet<usize> {
        let mut lines = BTreeSet::new();
        for &hit in hits {
            let lo = hit.saturating_sub(self.context_lines).max(1);
            let hi = hit.saturating_add(self.context_lines).min(file_len);
            lines.extend(lo..=hi);
        }
        lines
    }
}

/// Matched line numbers per file, in first-match file order.
fn group_by_file(matches: &[KeywordMatch]) -> Vec<(PathBuf, Vec<usize>)> {
    let mut order: Vec<PathBuf> = Vec::new();
    let mut by_file: HashMap<PathBuf, Vec<usize>> = HashMap::new();

    for m in matches {
        by_file
            .entry(m.path.clone())
            .or_insert_with(|| {
                order.push(m.path.clone());
                Vec::new()
            })
            .push(m.line);
    }

    order
        .into_iter()
        .filter_map(|p| by_file.remove(&p).map(|hits| (p, hits)))
        .collect()
}

/// Compile caller globs. An empty list means "match everything".
fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| SearchError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|source| SearchError::InvalidGlob {
        pattern: patterns.join(","),
        source,
    })?;
    Ok(Some(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Returns a fixed list of matches regardless of the pattern.
    struct FixedSearcher(Vec<KeywordMatch>);

    impl KeywordSearcher for FixedSearcher {
        fn name(&self) -> &str {
            "fixed"
        }

        fn find(&self, _: &str, _: &Path, _: &ExclusionSet) -> Result<Vec<KeywordMatch>> {
            Ok(self.0.clone())
        }
    }

    fn numbered_file(dir: &Path, name: &str, lines: usize) -> PathBuf {
        let path = dir.join(name);
        let body: Vec<String> = (1..=lines).map(|i| format!("line {}", i)).collect();
        fs::write(&path, body.join("\n")).unwrap();
        path
    }

    fn hit(path: &Path, line: usize) -> KeywordMatch {
        KeywordMatch {
            path: path.to_path_buf(),
            line,
            text: String::new(),
        }
    }

    #[test]
    fn test_window_around_match() {
        let tmp = TempDir::new().unwrap();
        let file = numbered_file(tmp.path(), "a.py", 30);
        let searcher = FixedSearcher(vec![hit(&file, 10)]);
        let exclusions = ExclusionSet::empty();

        let snippets = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("q", tmp.path(), &[])
            .unwrap();

        assert_eq!(snippets.len(), 1);
        let lines: Vec<&str> = snippets[0].code.lines().collect();
        assert_eq!(lines.first(), Some(&"line 5"));
        assert_eq!(lines.last(), Some(&"line 15"));
    }

    #[test]
    fn test_window_clamped_to_file_bounds() {
        let tmp = TempDir::new().unwrap();
        let file = numbered_file(tmp.path(), "a.py", 4);
        let searcher = FixedSearcher(vec![hit(&file, 2)]);
        let exclusions = ExclusionSet::empty();

        let snippets = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("q", tmp.path(), &[])
            .unwrap();

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].code, "line 1\nline 2\nline 3\nline 4");
    }

    #[test]
    fn test_overlapping_windows_merge_and_gaps_split() {
        let tmp = TempDir::new().unwrap();
        let file = numbered_file(tmp.path(), "a.py", 100);
        let searcher = FixedSearcher(vec![hit(&file, 10), hit(&file, 14), hit(&file, 60)]);
        let exclusions = ExclusionSet::empty();

        let snippets = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("q", tmp.path(), &[])
            .unwrap();

        assert_eq!(snippets.len(), 2);
        assert!(snippets[0].code.starts_with("line 5\n"));
        assert!(snippets[0].code.ends_with("line 19"));
        assert!(snippets[1].code.starts_with("line 55\n"));
        assert!(snippets[1].code.ends_with("line 65"));
    }

    #[test]
    fn test_huge_context_clamped_to_file() {
        let tmp = TempDir::new().unwrap();
        let file = numbered_file(tmp.path(), "a.py", 3);
        let searcher = FixedSearcher(vec![hit(&file, 2)]);
        let exclusions = ExclusionSet::empty();

        let snippets = KeywordCollector::new(&searcher, &exclusions, usize::MAX)
            .keyword_snippets("q", tmp.path(), &[])
            .unwrap();

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].code, "line 1\nline 2\nline 3");
    }

    #[test]
    fn test_glob_filter() {
        let tmp = TempDir::new().unwrap();
        let py = numbered_file(tmp.path(), "a.py", 3);
        let md = numbered_file(tmp.path(), "README.md", 3);
        let searcher = FixedSearcher(vec![hit(&py, 1), hit(&md, 1)]);
        let exclusions = ExclusionSet::empty();

        let snippets = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("q", tmp.path(), &["*.md".to_string()])
            .unwrap();

        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].path.ends_with("README.md"));
    }

    #[test]
    fn test_excluded_paths_dropped() {
        let tmp = TempDir::new().unwrap();
        let log = numbered_file(tmp.path(), "server.log", 3);
        let searcher = FixedSearcher(vec![hit(&log, 1)]);
        let exclusions = ExclusionSet::new([".log"]);

        let snippets = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("q", tmp.path(), &[])
            .unwrap();
        assert!(snippets.is_empty());
    }

    #[test]
    fn test_blank_runs_and_missing_files_skipped() {
        let tmp = TempDir::new().unwrap();
        let blank = tmp.path().join("blank.py");
        fs::write(&blank, "\n\n\n\n   \n").unwrap();
        let missing = tmp.path().join("gone.py");
        let searcher = FixedSearcher(vec![hit(&blank, 2), hit(&missing, 1)]);
        let exclusions = ExclusionSet::empty();

        let snippets = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("q", tmp.path(), &[])
            .unwrap();
        assert!(snippets.is_empty());
    }

    #[test]
    fn test_blank_query_short_circuits() {
        let tmp = TempDir::new().unwrap();
        let file = numbered_file(tmp.path(), "a.py", 3);
        let searcher = FixedSearcher(vec![hit(&file, 1)]);
        let exclusions = ExclusionSet::empty();

        let snippets = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("   ", tmp.path(), &[])
            .unwrap();
        assert!(snippets.is_empty());
    }

    #[test]
    fn test_invalid_glob_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let searcher = FixedSearcher(Vec::new());
        let exclusions = ExclusionSet::empty();

        let err = KeywordCollector::new(&searcher, &exclusions, 5)
            .keyword_snippets("q", tmp.path(), &["[".to_string()])
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidGlob { .. }));
    }
}
