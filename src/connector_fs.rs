use std::path::Path;
use walkdir::WalkDir;

use crate::chunk::split_blocks;
use crate::exclude::ExclusionSet;
use crate::models::Snippet;

/// Whole-tree collector: walks a directory and chunks every source file on
/// blank-line boundaries.
#[derive(Debug, Clone)]
pub struct TreeCollector {
    exclusions: ExclusionSet,
    extensions: Vec<String>,
}

impl TreeCollector {
    pub fn new(exclusions: ExclusionSet, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            exclusions,
            extensions,
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn has_known_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Collect snippets from every recognized file below `base_dir`.
    ///
    /// Best effort: unreadable entries and files are skipped.
    pub fn collect_code_snippets(
        &self,
        base_dir: &Path,
        max_chars_per_chunk: usize,
    ) -> Vec<Snippet> {
        let mut snippets = Vec::new();

        let walker = WalkDir::new(base_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir() && self.exclusions.is_excluded_dir(e.path()))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.exclusions.is_excluded_path(path) || !self.has_known_extension(path) {
                continue;
            }

            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes);
            let path_str = path.to_string_lossy().to_string();

            for block in split_blocks(&content, max_chars_per_chunk) {
                snippets.push(Snippet::new(path_str.clone(), block));
            }
        }

        tracing::info!(
            root = %base_dir.display(),
            snippets = snippets.len(),
            "collected tree snippets"
        );
        snippets
    }
}
