//! Line-oriented keyword search.
//!
//! The keyword collector only needs `(file, line)` pairs for lines matching
//! a pattern. [`KeywordSearcher`] hides where those come from:
//!
//! - **[`ExternalSearcher`]** shells out to `ag` or `rg` with an explicit
//!   timeout. Any failure (tool missing, non-zero exit, timeout) yields no
//!   matches.
//! - **[`NativeSearcher`]** walks the tree in-process with `walkdir` and
//!   `regex`.

use regex::RegexBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::chunk::truncate_chars;
use crate::config::KeywordConfig;
use crate::error::{Result, SearchError};
use crate::exclude::ExclusionSet;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A single matching line reported by a searcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub text: String,
}

/// Finds lines matching a regex pattern below `root`.
pub trait KeywordSearcher: Send + Sync {
    /// Short identifier for logs (e.g. `"ag"`).
    fn name(&self) -> &str;

    /// Return every matching line, in the order the backend reports them.
    /// Paths in the [`ExclusionSet`] must not be searched.
    fn find(
        &self,
        pattern: &str,
        root: &Path,
        exclusions: &ExclusionSet,
    ) -> Result<Vec<KeywordMatch>>;
}

/// Turn a free-text query into an alternation of its escaped words.
///
/// `"token image"` becomes `token|image`. Returns `None` for a blank query.
pub fn query_pattern(query: &str) -> Option<String> {
    let words: Vec<String> = query.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join("|"))
    }
}

/// Parse one `<file>:<line>:<text>` output line.
///
/// The split happens at the first `:<digits>:`, so file names containing
/// colons still parse as long as they aren't followed by a number.
pub fn parse_match_line(line: &str) -> Option<KeywordMatch> {
    let bytes = line.as_bytes();
    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find(':') {
        let colon = search_from + rel;
        let digits_start = colon + 1;
        let digits_len = bytes[digits_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let digits_end = digits_start + digits_len;
        if colon > 0 && digits_len > 0 && bytes.get(digits_end) == Some(&b':') {
            let number: usize = line[digits_start..digits_end].parse().ok()?;
            if number == 0 {
                return None;
            }
            return Some(KeywordMatch {
                path: PathBuf::from(&line[..colon]),
                line: number,
                text: line[digits_end + 1..].to_string(),
            });
        }
        search_from = digits_start;
    }
    None
}

/// Build the configured searcher (`ag`, `rg`, or `native`).
pub fn create_searcher(config: &KeywordConfig) -> Result<Box<dyn KeywordSearcher>> {
    match config.tool.as_str() {
        "ag" => Ok(Box::new(ExternalSearcher::new(
            SearchTool::Ag,
            config.timeout(),
            config.max_line_len,
        ))),
        "rg" => Ok(Box::new(ExternalSearcher::new(
            SearchTool::Ripgrep,
            config.timeout(),
            config.max_line_len,
        ))),
        "native" => Ok(Box::new(NativeSearcher::new(config.max_line_len))),
        other => Err(SearchError::Config(format!(
            "Unknown keyword search tool: {}",
            other
        ))),
    }
}

// ============ External tool ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTool {
    /// The Silver Searcher.
    Ag,
    /// ripgrep.
    Ripgrep,
}

impl SearchTool {
    pub fn program(&self) -> &'static str {
        match self {
            SearchTool::Ag => "ag",
            SearchTool::Ripgrep => "rg",
        }
    }
}

/// Runs `ag` or `rg` as a subprocess.
pub struct ExternalSearcher {
    tool: SearchTool,
    program: String,
    timeout: Duration,
    max_line_len: usize,
}

impl ExternalSearcher {
    pub fn new(tool: SearchTool, timeout: Duration, max_line_len: usize) -> Self {
        Self {
            tool,
            program: tool.program().to_string(),
            timeout,
            max_line_len,
        }
    }

    /// Use a different executable name or path for the same tool flavor.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Command-line arguments for the tool, excluding the program name.
    pub fn args(&self, pattern: &str, root: &Path, exclusions: &ExclusionSet) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match self.tool {
            SearchTool::Ag => {
                args.extend(["--nocolor", "--numbers", "--filename"].map(String::from));
                for dir in exclusions.dir_patterns() {
                    args.push("--ignore".to_string());
                    args.push(dir.replace('/', ""));
                }
                for file in exclusions.file_patterns() {
                    args.push("--ignore".to_string());
                    args.push(format!("*{}", file));
                }
            }
            SearchTool::Ripgrep => {
                args.extend(
                    [
                        "--no-heading",
                        "--line-number",
                        "--smart-case",
                        "--with-filename",
                        "--color",
                        "never",
                    ]
                    .map(String::from),
                );
                for dir in exclusions.dir_patterns() {
                    args.push("--glob".to_string());
                    args.push(format!("!**/{}/**", dir.trim_matches('/')));
                }
                for file in exclusions.file_patterns() {
                    args.push("--glob".to_string());
                    args.push(format!("!*{}", file));
                }
                args.push("--regexp".to_string());
                args.push(pattern.to_string());
                args.push(root.to_string_lossy().to_string());
                return args;
            }
        }
        args.push(pattern.to_string());
        args.push(root.to_string_lossy().to_string());
        args
    }

    /// Run the tool and return its stdout, or `None` on any failure.
    fn run(&self, args: &[String]) -> Option<String> {
        let mut child = match Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(
                    program = %self.program,
                    error = %e,
                    "failed to start keyword search tool"
                );
                return None;
            }
        };

        // Drain stdout on a helper thread so a full pipe can't block the child.
        // The thread is not joined; a grandchild may keep the pipe open.
        let mut stdout = child.stdout.take()?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        tracing::warn!(
                            program = %self.program,
                            timeout = ?self.timeout,
                            "keyword search timed out"
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        return None;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(
                        program = %self.program,
                        error = %e,
                        "failed to poll keyword search tool"
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
            }
        };

        if !status.success() {
            // ag and rg exit with 1 when nothing matched.
            tracing::debug!(
                program = %self.program,
                status = ?status.code(),
                "keyword search returned no matches"
            );
            return None;
        }

        let remaining = self
            .timeout
            .saturating_sub(start.elapsed())
            .max(POLL_INTERVAL);
        let output = match rx.recv_timeout(remaining) {
            Ok(output) => output,
            Err(_) => {
                tracing::warn!(
                    program = %self.program,
                    "keyword search output still open after exit"
                );
                return None;
            }
        };
        Some(String::from_utf8_lossy(&output).into_owned())
    }
}

impl KeywordSearcher for ExternalSearcher {
    fn name(&self) -> &str {
        self.tool.program()
    }

    fn find(
        &self,
        pattern: &str,
        root: &Path,
        exclusions: &ExclusionSet,
    ) -> Result<Vec<KeywordMatch>> {
        let args = self.args(pattern, root, exclusions);
        tracing::debug!(program = %self.program, ?args, "running keyword search");

        let Some(stdout) = self.run(&args) else {
            return Ok(Vec::new());
        };

        Ok(stdout
            .lines()
            .filter_map(parse_match_line)
            .filter(|m| !exclusions.is_excluded_path(&m.path))
            .map(|mut m| {
                m.text = truncate_chars(&m.text, self.max_line_len);
                m
            })
            .collect())
    }
}

// ============ Native ============

/// In-process searcher: walks `root` and matches each line with `regex`.
///
/// Matching is smart-case like `ag`: case-insensitive unless the pattern
/// contains an uppercase letter. Files containing a NUL byte are treated as
/// binary and skipped.
pub struct NativeSearcher {
    max_line_len: usize,
}

impl NativeSearcher {
    pub fn new(max_line_len: usize) -> Self {
        Self { max_line_len }
    }
}

impl Default for NativeSearcher {
    fn default() -> Self {
        Self::new(250)
    }
}

impl KeywordSearcher for NativeSearcher {
    fn name(&self) -> &str {
        "native"
    }

    fn find(
        &self,
        pattern: &str,
        root: &Path,
        exclusions: &ExclusionSet,
    ) -> Result<Vec<KeywordMatch>> {
        let case_insensitive = !pattern.chars().any(char::is_uppercase);
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;

        let mut matches = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && exclusions.is_excluded_dir(e.path())));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || exclusions.is_excluded_path(entry.path()) {
                continue;
            }

            let bytes = match std::fs::read(entry.path()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(
                        path = %entry.path().display(),
                        error = %e,
                        "skipping unreadable file"
                    );
                    continue;
                }
            };
            if bytes.contains(&0) {
                continue;
            }

            let content = String::from_utf8_lossy(&bytes);
            for (idx, line) in content.lines().enumerate() {
                if re.is_match(line) {
                    matches.push(KeywordMatch {
                        path: entry.path().to_path_buf(),
                        line: idx + 1,
                        text: truncate_chars(line, self.max_line_len),
                    });
                }
            }
        }

        Ok(matches)
    }
}
