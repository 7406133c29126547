// src/scan/walk.rs
// =============================================================================
// This module finds every HTML page under the build directory.
//
// How it works:
// 1. Walk the directory tree with `walkdir`, sorted by file name so that two
//    runs over the same tree visit pages in the same order
// 2. Prune any directory or file matching an exclude pattern (generator
//    caches like `.doctrees` are never part of the published site)
// 3. Keep files ending in .html / .htm
//
// Exclude patterns are globs. A pattern matches if it matches either the
// path relative to the root ("drafts/**") or any single path component
// (".doctrees").
// =============================================================================

use crate::error::{ConfigError, VerifierError};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Compiled exclude patterns.
#[derive(Debug, Clone, Default)]
pub struct Excludes {
    patterns: Vec<Pattern>,
}

impl Excludes {
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ConfigError::InvalidExclude {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// `relative` is the path below the build root.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.patterns.iter().any(|pattern| {
            pattern.matches_path(relative)
                || relative
                    .components()
                    .any(|c| pattern.matches(&c.as_os_str().to_string_lossy()))
        })
    }
}

/// Lists every HTML page under `root`, in a stable order.
///
/// Unreadable subdirectories are logged and skipped. Only a failure to read
/// the root itself is an error.
pub fn discover_pages(root: &Path, excludes: &Excludes) -> Result<Vec<PathBuf>, VerifierError> {
    let mut pages = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !entry_excluded(root, entry, excludes));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(VerifierError::Walk(e.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };

        if entry.file_type().is_file() && is_html(entry.path()) {
            pages.push(entry.into_path());
        }
    }

    tracing::debug!(count = pages.len(), root = %root.display(), "discovered pages");
    Ok(pages)
}

fn entry_excluded(root: &Path, entry: &DirEntry, excludes: &Excludes) -> bool {
    // The root itself is never excluded, even if its own name matches
    if entry.depth() == 0 {
        return false;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let excluded = excludes.is_excluded(relative);
    if excluded {
        tracing::debug!(path = %relative.display(), "excluded");
    }
    excluded
}

pub fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn excludes(patterns: &[&str]) -> Excludes {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        Excludes::new(&owned).unwrap()
    }

    #[test]
    fn test_component_pattern() {
        let ex = excludes(&[".doctrees"]);
        assert!(ex.is_excluded(Path::new(".doctrees/index.html")));
        assert!(ex.is_excluded(Path::new("api/.doctrees/x.html")));
        assert!(!ex.is_excluded(Path::new("api/index.html")));
    }

    #[test]
    fn test_relative_path_pattern() {
        let ex = excludes(&["drafts/**"]);
        assert!(ex.is_excluded(Path::new("drafts/wip.html")));
        assert!(!ex.is_excluded(Path::new("guide/drafts.html")));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Excludes::new(&["[".to_string()]).is_err());
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("guide")).unwrap();
        fs::create_dir_all(root.join(".doctrees")).unwrap();
        fs::write(root.join("index.html"), "").unwrap();
        fs::write(root.join("guide/b.htm"), "").unwrap();
        fs::write(root.join("guide/a.html"), "").unwrap();
        fs::write(root.join("guide/notes.txt"), "").unwrap();
        fs::write(root.join(".doctrees/cached.html"), "").unwrap();

        let pages = discover_pages(root, &excludes(&[".doctrees"])).unwrap();
        let relative: Vec<_> = pages
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("guide/a.html"),
                PathBuf::from("guide/b.htm"),
                PathBuf::from("index.html"),
            ]
        );
    }
}
