// src/checker/anchor.rs
// =============================================================================
// Anchor bookkeeping.
//
// Every page declares a set of anchor ids (`id="..."` and the legacy
// `name="..."`). Links point at them with a `#fragment`, which may be
// percent-encoded: `#%F0%9F%9A%80` must match `id="🚀"`.
//
// Matching is exact. We decode the %XX bytes, interpret the result as UTF-8
// and compare with the id string as parsed from the HTML. No case folding and
// no Unicode normalization.
// =============================================================================

use crate::scan::{self, Page};
use percent_encoding::percent_decode_str;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub type AnchorSet = HashSet<String>;

/// Decodes a raw fragment (without the leading '#').
///
/// Invalid UTF-8 after decoding is replaced with U+FFFD, so such a fragment
/// only matches an id that literally contains the replacement character.
pub fn decode_fragment(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// True if `anchors` declares the fragment.
///
/// The decoded form is tried first. The raw form is accepted too, for
/// generators that write percent signs into the id itself.
pub fn has_anchor(anchors: &AnchorSet, decoded: &str, raw: &str) -> bool {
    anchors.contains(decoded) || anchors.contains(raw)
}

// What we know about one page's anchors
#[derive(Debug, Clone)]
pub enum AnchorEntry {
    Parsed(AnchorSet),
    /// The page exists but could not be parsed; holds the reason.
    Failed(String),
}

/// Page path -> anchors declared in that page.
///
/// Filled from the scan, then extended lazily when a link targets an HTML
/// file the scan didn't cover (for example one inside an excluded directory).
#[derive(Debug, Default)]
pub struct AnchorIndex {
    pages: HashMap<PathBuf, AnchorEntry>,
}

impl AnchorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: &[Page]) -> Self {
        let mut index = Self::new();
        for page in pages {
            index.insert(page.path.clone(), page.anchors.clone());
        }
        index
    }

    pub fn insert(&mut self, path: PathBuf, anchors: AnchorSet) {
        self.pages.insert(path, AnchorEntry::Parsed(anchors));
    }

    pub fn mark_failed(&mut self, path: PathBuf, reason: String) {
        self.pages.insert(path, AnchorEntry::Failed(reason));
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Returns the anchors of `path`, parsing the file the first time it is
    /// asked for.
    pub fn load(&mut self, path: &Path) -> &AnchorEntry {
        if !self.pages.contains_key(path) {
            let entry = match scan::read_page(path, &[]) {
                Ok(page) => AnchorEntry::Parsed(page.anchors),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not parse link target");
                    AnchorEntry::Failed(e.to_string())
                }
            };
            self.pages.insert(path.to_path_buf(), entry);
        }
        &self.pages[path]
    }
}
