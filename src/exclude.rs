//! Substring-based path exclusion.
//!
//! An [`ExclusionSet`] is an ordered list of patterns. A path is excluded
//! when any pattern occurs in its forward-slash-normalized form. Patterns
//! ending in `/` name directories; everything else is a file pattern
//! (usually a suffix such as `.png` or `yarn.lock`).

use std::path::Path;

/// Paths and suffixes that are never worth searching.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "/node_modules/",
    "/vendor/",
    ".env",
    "/.git/",
    "venv/",
    ".png",
    ".jpeg",
    ".token.json",
    ".svg",
    ".pytest_cache",
    ".vscode-test",
    "/.nuxt/",
    "/dist/",
    "/build/",
    "__init__.py",
    "/.pytest_cache/",
    ".eslintcache",
    "yarn.lock",
    "package-lock.json",
    ".gitignore",
    ".log",
    ".editorconfig",
    ".eslintignore",
    ".eslintrc.js",
    ".tool-versions",
    ".prettierrc",
    "/coverage/",
    "go.mod",
    "go.sum",
    ".ttf",
    "/.husky/",
    ".dockerignore",
    ".nvmrc",
    "__pycache__/",
    ".pdf",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionSet {
    patterns: Vec<String>,
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDE.iter().map(|p| p.to_string()))
    }
}

impl ExclusionSet {
    /// Build a set from patterns, dropping empty ones and duplicates while
    /// keeping first-seen order.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for p in patterns {
            let p = p.into();
            if !p.is_empty() && !out.contains(&p) {
                out.push(p);
            }
        }
        Self { patterns: out }
    }

    /// A set that excludes nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Append patterns, keeping the set free of duplicates.
    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for p in patterns {
            let p = p.into();
            if !p.is_empty() && !self.patterns.contains(&p) {
                self.patterns.push(p);
            }
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Directory patterns (`/node_modules/`, `__pycache__/`).
    pub fn dir_patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns
            .iter()
            .filter(|p| p.ends_with('/'))
            .map(String::as_str)
    }

    /// File patterns (`.png`, `yarn.lock`).
    pub fn file_patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns
            .iter()
            .filter(|p| !p.ends_with('/'))
            .map(String::as_str)
    }

    /// True if any pattern is a substring of the normalized path.
    pub fn is_excluded(&self, path: &str) -> bool {
        let normalized = normalize(path);
        self.patterns.iter().any(|p| normalized.contains(p.as_str()))
    }

    pub fn is_excluded_path(&self, path: &Path) -> bool {
        self.is_excluded(&path.to_string_lossy())
    }

    /// Directory check: the path is tested with a trailing `/` so that
    /// `/node_modules/` matches the directory `src/node_modules` itself.
    pub fn is_excluded_dir(&self, path: &Path) -> bool {
        let mut s = normalize(&path.to_string_lossy());
        if !s.ends_with('/') {
            s.push('/');
        }
        self.patterns.iter().any(|p| s.contains(p.as_str()))
    }
}

/// Replace backslashes with forward slashes.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_by_substring() {
        let set = ExclusionSet::default();
        assert!(set.is_excluded("repo/node_modules/lodash/index.js"));
        assert!(set.is_excluded("repo/assets/logo.png"));
        assert!(set.is_excluded("repo/pkg/__init__.py"));
        assert!(!set.is_excluded("repo/src/main.py"));
    }

    #[test]
    fn normalizes_backslashes() {
        let set = ExclusionSet::new(["/vendor/"]);
        assert!(set.is_excluded("C:\\repo\\vendor\\lib.go"));
    }

    #[test]
    fn dir_check_adds_trailing_slash() {
        let set = ExclusionSet::new(["/node_modules/"]);
        assert!(set.is_excluded_dir(Path::new("repo/node_modules")));
        assert!(!set.is_excluded_dir(Path::new("repo/node_modules_old")));
    }

    #[test]
    fn splits_dir_and_file_patterns() {
        let set = ExclusionSet::new(["/dist/", ".log", "__pycache__/"]);
        let dirs: Vec<&str> = set.dir_patterns().collect();
        let files: Vec<&str> = set.file_patterns().collect();
        assert_eq!(dirs, vec!["/dist/", "__pycache__/"]);
        assert_eq!(files, vec![".log"]);
    }

    #[test]
    fn dedupes_and_drops_empty() {
        let mut set = ExclusionSet::new([".log", "", ".log"]);
        set.extend([".tmp", ".log"]);
        assert_eq!(set.patterns(), &[".log".to_string(), ".tmp".to_string()]);
    }

    #[test]
    fn empty_set_excludes_nothing() {
        let set = ExclusionSet::empty();
        assert!(set.is_empty());
        assert!(!set.is_excluded("anything/at/all.png"));
    }
}
