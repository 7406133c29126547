// src/scan/page.rs
// =============================================================================
// This module turns one HTML file into a `Page`.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Is built on html5ever, so broken markup is repaired instead of rejected
//
// From every page we keep two things:
// - anchors: the values of all `id` and `name` attributes
// - links: every `<a href>` in document order, plus whether the element
//   carries a UI marker (dropdown toggles and friends)
//
// Rust concepts:
// - Iterators: walking the DOM with descendants()
// - Option: attributes may or may not be present
// =============================================================================

use crate::checker::AnchorSet;
use crate::config::UiMarker;
use crate::error::ParseError;
use scraper::{ElementRef, Html};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One `<a href>` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    /// The UI marker found on the element, if any (e.g. "aria-haspopup").
    pub ui_marker: Option<String>,
}

/// A parsed HTML page. Immutable once built.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: PathBuf,
    pub anchors: AnchorSet,
    pub links: Vec<RawLink>,
}

/// A page we found but could not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Parses HTML text into a `Page`
///
/// Parameters:
///   path: where the page lives (stored as-is)
///   html: the page content
///   markers: attributes that flag an anchor element as a UI trigger
pub fn parse_page(path: &Path, html: &str, markers: &[UiMarker]) -> Page {
    let document = Html::parse_document(html);

    let mut anchors = AnchorSet::new();
    let mut links = Vec::new();

    // descendants() visits nodes in document order, which keeps the link
    // list (and therefore the report) stable between runs
    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let element = element.value();

        for attr in ["id", "name"] {
            if let Some(value) = element.attr(attr) {
                if !value.is_empty() {
                    anchors.insert(value.to_string());
                }
            }
        }

        if element.name() != "a" {
            continue;
        }
        if let Some(href) = element.attr("href") {
            let ui_marker = element.attrs().find_map(|(name, value)| {
                markers
                    .iter()
                    .find(|marker| marker.matches(name, value))
                    .map(|marker| marker.to_string())
            });
            links.push(RawLink {
                href: href.trim().to_string(),
                ui_marker,
            });
        }
    }

    Page {
        path: path.to_path_buf(),
        anchors,
        links,
    }
}

/// Reads and parses a page from disk.
///
/// The HTML parser itself never fails; what can fail is getting the text:
/// the file may be unreadable or not UTF-8.
pub fn read_page(path: &Path, markers: &[UiMarker]) -> Result<Page, ParseError> {
    let bytes = std::fs::read(path)?;
    let html = String::from_utf8(bytes)
        .map_err(|e| ParseError::Encoding(e.utf8_error().valid_up_to()))?;
    Ok(parse_page(path, &html, markers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Page {
        parse_page(Path::new("/site/index.html"), html, &UiMarker::defaults())
    }

    #[test]
    fn test_collects_ids_and_names() {
        let page = parse(
            r#"<h2 id="usage">Usage</h2><a name="legacy"></a><section id="🚀">x</section>"#,
        );
        assert!(page.anchors.contains("usage"));
        assert!(page.anchors.contains("legacy"));
        assert!(page.anchors.contains("🚀"));
    }

    #[test]
    fn test_links_in_document_order() {
        let page = parse(
            r##"<a href="b.html">B</a><p><a href="#top">top</a></p><a href="https://x.org">x</a>"##,
        );
        let hrefs: Vec<_> = page.links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["b.html", "#top", "https://x.org"]);
    }

    #[test]
    fn test_anchor_without_href_is_not_a_link() {
        let page = parse(r#"<a name="here">here</a>"#);
        assert!(page.links.is_empty());
        assert!(page.anchors.contains("here"));
    }

    #[test]
    fn test_ui_marker_detected() {
        let page = parse(
            r##"<a href="#" class="dropdown-toggle" aria-haspopup="true">Menu</a>
                <a href="#" role="button">Toggle</a>
                <a href="#">Plain</a>"##,
        );
        assert_eq!(page.links[0].ui_marker.as_deref(), Some("aria-haspopup"));
        assert_eq!(page.links[1].ui_marker.as_deref(), Some("role=button"));
        assert_eq!(page.links[2].ui_marker, None);
    }

    #[test]
    fn test_malformed_html_is_tolerated() {
        let page = parse(r#"<div id="a"><a href="x.html">unclosed <p id="b"><a href="y.html">"#);
        assert_eq!(page.links.len(), 2);
        assert!(page.anchors.contains("a"));
        assert!(page.anchors.contains("b"));
    }

    #[test]
    fn test_non_utf8_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.html");
        std::fs::write(&path, b"<p>caf\xe9</p>").unwrap();
        assert!(matches!(read_page(&path, &[]), Err(ParseError::Encoding(6))));
    }
}
