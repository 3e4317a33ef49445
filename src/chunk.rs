//! Blank-line chunker and line-run grouping.
//!
//! [`split_blocks`] splits file content on one or more blank lines, which
//! approximates paragraph and function boundaries without parsing.
//! [`contiguous_runs`] groups sorted line numbers into runs used to rebuild
//! snippets around keyword matches.

use once_cell::sync::Lazy;
use regex::Regex;

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

/// Split text into trimmed, non-empty blocks of at most `max_chars`
/// characters each. Blocks longer than the limit are truncated, not split.
pub fn split_blocks(text: &str, max_chars: usize) -> Vec<String> {
    BLANK_LINES
        .split(text)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| truncate_chars(block, max_chars))
        .collect()
}

/// Keep the first `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Group ascending, deduplicated line numbers into inclusive runs.
/// A run breaks when two consecutive numbers differ by more than one.
pub fn contiguous_runs(lines: &[usize]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut iter = lines.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };

    let mut start = first;
    let mut last = first;
    for line in iter {
        if line > last + 1 {
            runs.push((start, last));
            start = line;
        }
        last = line;
    }
    runs.push((start, last));
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_blank_lines() {
        let text = "fn a() {}\n\nfn b() {}\n  \n\n fn c() {}\n";
        let blocks = split_blocks(text, 600);
        assert_eq!(blocks, vec!["fn a() {}", "fn b() {}", "fn c() {}"]);
    }

    #[test]
    fn test_keeps_single_newlines_together() {
        let text = "line one\nline two\n\nline three";
        let blocks = split_blocks(text, 600);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "line one\nline two");
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(split_blocks("", 600).is_empty());
        assert!(split_blocks("\n\n   \n\n", 600).is_empty());
    }

    #[test]
    fn test_truncates_by_chars() {
        let blocks = split_blocks("héllo wörld", 4);
        assert_eq!(blocks, vec!["héll"]);
    }

    #[test]
    fn test_runs_break_on_gaps() {
        let runs = contiguous_runs(&[1, 2, 3, 7, 8, 12]);
        assert_eq!(runs, vec![(1, 3), (7, 8), (12, 12)]);
    }

    #[test]
    fn test_runs_empty_and_single() {
        assert!(contiguous_runs(&[]).is_empty());
        assert_eq!(contiguous_runs(&[5]), vec![(5, 5)]);
    }
}
