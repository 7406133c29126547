// src/checker/internal.rs
// =============================================================================
// This module resolves internal links against the build directory.
//
// Algorithm, in order:
// 1. "/x" resolves from the build root, "x" from the linking page's directory
// 2. no extension and not a file      -> try "x.html"
// 3. a directory                      -> try "x/index.html"
// 4. still nothing                    -> broken: "target file not found"
// 5. with a #fragment, the target page must declare that anchor
//    -> otherwise broken: "anchor not found in target"
//
// Paths are normalized lexically ("a/../b" -> "b") because the target may
// not exist, and canonicalize() needs an existing file.
// =============================================================================

use super::anchor::{has_anchor, AnchorEntry, AnchorIndex};
use super::Verdict;
use crate::scan::{is_html, Page};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

pub const TARGET_NOT_FOUND: &str = "target file not found";
pub const ANCHOR_NOT_FOUND: &str = "anchor not found in target";

/// Checks a `#fragment` link against the page it appears in.
///
/// The fragment is already decoded; `raw` is the text as written in the href.
pub fn check_same_document(page: &Page, fragment: &str, raw: &str) -> Verdict {
    if fragment.is_empty() {
        return Verdict::broken("empty anchor");
    }
    if has_anchor(&page.anchors, fragment, raw) {
        Verdict::ok()
    } else {
        Verdict::broken(format!("anchor not found in page: #{}", fragment))
    }
}

/// Finds the file a normalized path refers to, applying the `.html` and
/// `index.html` fallbacks.
pub fn locate_target(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }

    if candidate.extension().is_none() {
        let mut with_ext = OsString::from(candidate.as_os_str());
        with_ext.push(".html");
        let with_ext = PathBuf::from(with_ext);
        if with_ext.is_file() {
            return Some(with_ext);
        }
    }

    if candidate.is_dir() {
        let index = candidate.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Resolves internal links for one build directory.
///
/// Holds the anchor index mutably because targets outside the scanned set are
/// parsed (once) on demand.
pub struct InternalResolver<'a> {
    root: &'a Path,
    anchors: &'a mut AnchorIndex,
}

impl<'a> InternalResolver<'a> {
    /// `root` must be absolute and normalized (the verifier canonicalizes it).
    pub fn new(root: &'a Path, anchors: &'a mut AnchorIndex) -> Self {
        Self { root, anchors }
    }

    /// Resolves `path` (decoded) from `source`, then checks the fragment.
    pub fn check(
        &mut self,
        source: &Page,
        path: &str,
        absolute: bool,
        fragment: Option<&str>,
        raw_fragment: Option<&str>,
    ) -> Verdict {
        let target = if path.is_empty() {
            // "?query#frag" or "#frag" after a same-host URL: the page itself
            source.path.clone()
        } else {
            let base = if absolute {
                self.root.to_path_buf()
            } else {
                source
                    .path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.to_path_buf())
            };
            let candidate = normalize(&base.join(path.trim_start_matches('/')));
            if !candidate.starts_with(self.root) {
                return Verdict::broken("target outside build root");
            }
            match locate_target(&candidate) {
                Some(found) => found,
                None => return Verdict::broken(TARGET_NOT_FOUND),
            }
        };

        let Some(fragment) = fragment else {
            return Verdict::ok();
        };
        let raw = raw_fragment.unwrap_or(fragment);

        if target == source.path {
            return check_same_document(source, fragment, raw);
        }
        if fragment.is_empty() || !is_html(&target) {
            // "page.html#" and fragments into PDFs/images are not anchor checks
            return Verdict::ok();
        }

        match self.anchors.load(&target) {
            AnchorEntry::Parsed(anchors) if has_anchor(anchors, fragment, raw) => Verdict::ok(),
            AnchorEntry::Parsed(_) => {
                Verdict::broken(format!("{}: #{}", ANCHOR_NOT_FOUND, fragment))
            }
            AnchorEntry::Failed(reason) => {
                Verdict::error(format!("target page could not be parsed: {}", reason))
            }
        }
    }
}

/// Removes "." and resolves ".." without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::parse_page;
    use std::fs;

    struct Site {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    impl Site {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().canonicalize().unwrap();
            for (rel, content) in files {
                let path = root.join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            Site { _dir: dir, root }
        }

        fn page(&self, rel: &str) -> Page {
            let path = self.root.join(rel);
            let html = fs::read_to_string(&path).unwrap();
            parse_page(&path, &html, &[])
        }
    }

    fn check(site: &Site, from: &str, href_path: &str, fragment: Option<&str>) -> Verdict {
        let source = site.page(from);
        let mut index = AnchorIndex::from_pages(std::slice::from_ref(&source));
        let mut resolver = InternalResolver::new(&site.root, &mut index);
        resolver.check(
            &source,
            href_path,
            href_path.starts_with('/'),
            fragment,
            fragment,
        )
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_extension_elision() {
        let site = Site::new(&[("index.html", ""), ("page2.html", "")]);
        assert_eq!(check(&site, "index.html", "page2", None), Verdict::ok());
    }

    #[test]
    fn test_directory_index() {
        let site = Site::new(&[("index.html", ""), ("dir/index.html", "")]);
        assert_eq!(check(&site, "index.html", "/dir/", None), Verdict::ok());
        assert_eq!(check(&site, "index.html", "dir", None), Verdict::ok());
    }

    #[test]
    fn test_relative_to_source_directory() {
        let site = Site::new(&[("guide/a.html", ""), ("guide/b.html", ""), ("api/x.html", "")]);
        assert_eq!(check(&site, "guide/a.html", "b.html", None), Verdict::ok());
        assert_eq!(check(&site, "guide/a.html", "../api/x.html", None), Verdict::ok());
        assert_eq!(
            check(&site, "guide/a.html", "x.html", None),
            Verdict::broken(TARGET_NOT_FOUND)
        );
    }

    #[test]
    fn test_missing_target() {
        let site = Site::new(&[("index.html", "")]);
        assert_eq!(
            check(&site, "index.html", "nope", None),
            Verdict::broken(TARGET_NOT_FOUND)
        );
    }

    #[test]
    fn test_escape_root() {
        let site = Site::new(&[("index.html", "")]);
        assert_eq!(
            check(&site, "index.html", "../../etc/passwd", None),
            Verdict::broken("target outside build root")
        );
    }

    #[test]
    fn test_cross_page_anchor() {
        let site = Site::new(&[
            ("index.html", ""),
            ("setup.html", r#"<h2 id="install">Install</h2>"#),
        ]);
        assert_eq!(
            check(&site, "index.html", "setup.html", Some("install")),
            Verdict::ok()
        );
        assert_eq!(
            check(&site, "index.html", "setup", Some("uninstall")),
            Verdict::broken("anchor not found in target: #uninstall")
        );
    }

    #[test]
    fn test_fragment_into_non_html_not_checked() {
        let site = Site::new(&[("index.html", ""), ("manual.pdf", "%PDF")]);
        assert_eq!(
            check(&site, "index.html", "manual.pdf", Some("page=3")),
            Verdict::ok()
        );
    }

    #[test]
    fn test_self_reference_uses_source_anchors() {
        let site = Site::new(&[("index.html", r#"<p id="ünïcode">x</p>"#)]);
        assert_eq!(
            check(&site, "index.html", "index.html", Some("ünïcode")),
            Verdict::ok()
        );
        assert_eq!(check(&site, "index.html", "", Some("ünïcode")), Verdict::ok());
    }

    #[test]
    fn test_unparseable_target_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("index.html"), "").unwrap();
        fs::write(root.join("bad.html"), [0xc3u8, 0x28]).unwrap();
        let source = parse_page(&root.join("index.html"), "", &[]);
        let mut index = AnchorIndex::new();
        let mut resolver = InternalResolver::new(&root, &mut index);
        let verdict = resolver.check(&source, "bad.html", false, Some("x"), Some("x"));
        assert_eq!(verdict.outcome, crate::checker::Outcome::Error);
    }

    #[test]
    fn test_same_document() {
        let page = parse_page(
            Path::new("/site/index.html"),
            r#"<h1 id="🚀">Launch</h1>"#,
            &[],
        );
        assert_eq!(check_same_document(&page, "🚀", "%F0%9F%9A%80"), Verdict::ok());
        assert_eq!(
            check_same_document(&page, "missing", "missing"),
            Verdict::broken("anchor not found in page: #missing")
        );
        assert_eq!(check_same_document(&page, "", ""), Verdict::broken("empty anchor"));
    }
}
