// src/scan/mod.rs
// =============================================================================
// This module reads the build directory.
//
// Submodules:
// - walk: finds the HTML files (with exclude patterns)
// - page: parses one file into anchors and links
//
// A page that cannot be read is not fatal. It is recorded as a PageFailure
// and the scan moves on, so one bad file never hides the rest of the report.
// =============================================================================

mod page;
mod walk;

pub use page::{parse_page, read_page, Page, PageFailure, RawLink};
pub use walk::{discover_pages, is_html, Excludes};

use crate::config::UiMarker;
use crate::error::VerifierError;
use std::path::Path;

/// Everything the scan pass produced.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub pages: Vec<Page>,
    pub failures: Vec<PageFailure>,
}

/// Walks `root` and parses every page found.
pub fn scan_site(
    root: &Path,
    excludes: &Excludes,
    markers: &[UiMarker],
) -> Result<ScanResult, VerifierError> {
    let mut result = ScanResult::default();

    for path in discover_pages(root, excludes)? {
        match read_page(&path, markers) {
            Ok(page) => {
                tracing::debug!(
                    page = %path.display(),
                    links = page.links.len(),
                    anchors = page.anchors.len(),
                    "parsed page"
                );
                result.pages.push(page);
            }
            Err(e) => {
                tracing::warn!(page = %path.display(), error = %e, "failed to parse page");
                result.failures.push(PageFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(result)
}
