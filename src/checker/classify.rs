// src/checker/classify.rs
// =============================================================================
// This module decides what kind of link an href is.
//
// Precedence (first match wins):
// 1. empty href, mailto:, tel:, javascript:, data:  -> skip
// 2. href="#" on a UI trigger (aria-haspopup, ...)  -> skip
// 3. "#fragment"                                    -> same-document anchor
// 4. http://, https://, //host                      -> external
//    (unless it falls under the site's own URL, then it's internal)
// 5. any other scheme (ftp:, file:, ...)            -> skip
// 6. everything else                                -> internal path
//
// Fragments and paths are percent-decoded here, so later stages only ever
// compare decoded strings.
// =============================================================================

use super::anchor::decode_fragment;
use crate::scan::RawLink;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::Url;

const PSEUDO_SCHEMES: &[&str] = &["mailto", "tel", "javascript", "data"];

/// Why a link was not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyHref,
    /// `href="#"` on an element carrying this UI marker
    UiTrigger(String),
    PseudoScheme(String),
    UnsupportedScheme(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyHref => write!(f, "empty href"),
            SkipReason::UiTrigger(marker) => write!(f, "UI trigger ({})", marker),
            SkipReason::PseudoScheme(scheme) => write!(f, "{}: link", scheme),
            SkipReason::UnsupportedScheme(scheme) => write!(f, "unsupported scheme {}:", scheme),
        }
    }
}

/// The classified, decoded target of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum LinkKind {
    /// `#fragment` in the same page. `raw` keeps the fragment as written.
    Anchor { fragment: String, raw: String },
    /// A file in the build directory.
    Internal {
        /// Decoded path; empty means "this page" (e.g. `?tab=2#x`)
        path: String,
        /// Starts with '/', resolved against the build root
        absolute: bool,
        fragment: Option<String>,
        #[serde(skip)]
        raw_fragment: Option<String>,
    },
    External { url: String },
    Skip { reason: SkipReason },
}

impl LinkKind {
    pub fn is_external(&self) -> bool {
        matches!(self, LinkKind::External { .. })
    }

    /// Anchor-only and internal path links both resolve against the build dir.
    pub fn is_internal(&self) -> bool {
        matches!(self, LinkKind::Anchor { .. } | LinkKind::Internal { .. })
    }
}

// Where the build directory is published: "https://docs.example.com/latest/"
#[derive(Debug, Clone)]
struct SiteBase {
    /// Lowercased
    host: String,
    /// URL path of the build root, always ending in '/'
    prefix: String,
}

impl SiteBase {
    fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let mut prefix = url.path().to_string();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Some(Self { host, prefix })
    }

    // The part of the URL path below the build root, or None when the URL is
    // not part of this site
    fn relative_path<'u>(&self, url: &'u Url) -> Option<&'u str> {
        let same_host = url
            .host_str()
            .map(|h| h.eq_ignore_ascii_case(&self.host))
            .unwrap_or(false);
        if !same_host {
            return None;
        }
        let path = url.path();
        if let Some(rest) = path.strip_prefix(self.prefix.as_str()) {
            return Some(rest);
        }
        // "https://docs.example.com/latest" is the root itself
        (path == self.prefix.trim_end_matches('/')).then_some("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    site: Option<SiteBase>,
}

impl Classifier {
    /// `site_url` is the public URL of the build root, if known. Absolute
    /// links below it are resolved on disk instead of over the network.
    pub fn new(site_url: Option<&Url>) -> Self {
        Self {
            site: site_url.and_then(SiteBase::from_url),
        }
    }

    pub fn classify(&self, link: &RawLink) -> LinkKind {
        let href = link.href.trim();

        if href.is_empty() {
            return LinkKind::Skip {
                reason: SkipReason::EmptyHref,
            };
        }

        let scheme = scheme_of(href);
        if let Some(scheme) = &scheme {
            if PSEUDO_SCHEMES.contains(&scheme.as_str()) {
                return LinkKind::Skip {
                    reason: SkipReason::PseudoScheme(scheme.clone()),
                };
            }
        }

        if let Some(raw) = href.strip_prefix('#') {
            if raw.is_empty() {
                if let Some(marker) = &link.ui_marker {
                    return LinkKind::Skip {
                        reason: SkipReason::UiTrigger(marker.clone()),
                    };
                }
            }
            return LinkKind::Anchor {
                fragment: decode_fragment(raw),
                raw: raw.to_string(),
            };
        }

        let is_web = href.starts_with("//")
            || matches!(scheme.as_deref(), Some("http") | Some("https"));
        if is_web {
            return self.classify_web_url(href);
        }

        if let Some(scheme) = scheme {
            return LinkKind::Skip {
                reason: SkipReason::UnsupportedScheme(scheme),
            };
        }

        internal_reference(href)
    }

    // http(s) and protocol-relative URLs
    fn classify_web_url(&self, href: &str) -> LinkKind {
        let absolute = if href.starts_with("//") {
            format!("https:{}", href)
        } else {
            href.to_string()
        };

        if let (Some(site), Ok(url)) = (&self.site, Url::parse(&absolute)) {
            if let Some(relative) = site.relative_path(&url) {
                let mut reference = format!("/{}", relative);
                if let Some(fragment) = url.fragment() {
                    reference.push('#');
                    reference.push_str(fragment);
                }
                return internal_reference(&reference);
            }
        }

        LinkKind::External { url: absolute }
    }
}

/// Splits "path?query#fragment" into a decoded internal reference.
fn internal_reference(href: &str) -> LinkKind {
    let (before_fragment, raw_fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    };
    let raw_path = before_fragment
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(before_fragment);

    LinkKind::Internal {
        path: percent_decode_str(raw_path).decode_utf8_lossy().into_owned(),
        absolute: raw_path.starts_with('/'),
        fragment: raw_fragment.map(decode_fragment),
        raw_fragment: raw_fragment.map(str::to_string),
    }
}

/// Returns the lowercased URL scheme, if the href has one.
///
/// A scheme is letters followed by letters, digits, '+', '-' or '.', ended by
/// ':' before any '/', '?' or '#'.
fn scheme_of(href: &str) -> Option<String> {
    let colon = href.find(':')?;
    let candidate = &href[..colon];
    if candidate.contains(|c: char| matches!(c, '/' | '?' | '#')) {
        return None;
    }
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(candidate.to_ascii_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str) -> RawLink {
        RawLink {
            href: href.to_string(),
            ui_marker: None,
        }
    }

    fn classify(href: &str) -> LinkKind {
        Classifier::default().classify(&link(href))
    }

    #[test]
    fn test_pseudo_schemes_skipped() {
        for href in ["mailto:a@b.c", "tel:+123", "javascript:void(0)", "JavaScript:x()"] {
            assert!(
                matches!(classify(href), LinkKind::Skip { reason: SkipReason::PseudoScheme(_) }),
                "{} should be skipped",
                href
            );
        }
    }

    #[test]
    fn test_dropdown_trigger_skipped() {
        let trigger = RawLink {
            href: "#".to_string(),
            ui_marker: Some("aria-haspopup".to_string()),
        };
        assert_eq!(
            Classifier::default().classify(&trigger),
            LinkKind::Skip {
                reason: SkipReason::UiTrigger("aria-haspopup".to_string())
            }
        );
    }

    #[test]
    fn test_bare_hash_without_marker_is_anchor() {
        assert_eq!(
            classify("#"),
            LinkKind::Anchor {
                fragment: String::new(),
                raw: String::new()
            }
        );
    }

    #[test]
    fn test_marker_only_matters_for_bare_hash() {
        let link = RawLink {
            href: "#section".to_string(),
            ui_marker: Some("role=button".to_string()),
        };
        assert!(matches!(
            Classifier::default().classify(&link),
            LinkKind::Anchor { .. }
        ));
    }

    #[test]
    fn test_anchor_decoded() {
        assert_eq!(
            classify("#%F0%9F%8E%89-party"),
            LinkKind::Anchor {
                fragment: "🎉-party".to_string(),
                raw: "%F0%9F%8E%89-party".to_string()
            }
        );
    }

    #[test]
    fn test_external_urls() {
        assert_eq!(
            classify("https://www.rust-lang.org/learn"),
            LinkKind::External {
                url: "https://www.rust-lang.org/learn".to_string()
            }
        );
        assert_eq!(
            classify("//cdn.example.com/lib.js"),
            LinkKind::External {
                url: "https://cdn.example.com/lib.js".to_string()
            }
        );
    }

    fn site(url: &str) -> Classifier {
        Classifier::new(Some(&Url::parse(url).unwrap()))
    }

    #[test]
    fn test_same_host_is_internal() {
        let kind = site("https://docs.example.com/")
            .classify(&link("https://DOCS.example.com/guide/setup.html#install"));
        assert_eq!(
            kind,
            LinkKind::Internal {
                path: "/guide/setup.html".to_string(),
                absolute: true,
                fragment: Some("install".to_string()),
                raw_fragment: Some("install".to_string()),
            }
        );
    }

    #[test]
    fn test_site_path_prefix_stripped() {
        let classifier = site("https://docs.example.com/latest/");
        assert_eq!(
            classifier.classify(&link("https://docs.example.com/latest/guide.html#x")),
            LinkKind::Internal {
                path: "/guide.html".to_string(),
                absolute: true,
                fragment: Some("x".to_string()),
                raw_fragment: Some("x".to_string()),
            }
        );
        assert!(matches!(
            classifier.classify(&link("https://docs.example.com/latest")),
            LinkKind::Internal { path, .. } if path == "/"
        ));
    }

    #[test]
    fn test_same_host_outside_site_path_is_external() {
        let classifier = site("https://docs.example.com/latest");
        for href in [
            "https://docs.example.com/v1/old.html",
            "https://docs.example.com/latest-beta/x.html",
            "https://example.com/latest/guide.html",
        ] {
            assert!(
                classifier.classify(&link(href)).is_external(),
                "{} should be external",
                href
            );
        }
    }

    #[test]
    fn test_internal_relative_with_query_and_fragment() {
        assert_eq!(
            classify("../api/my%20module.html?v=2#Foo%20Bar"),
            LinkKind::Internal {
                path: "../api/my module.html".to_string(),
                absolute: false,
                fragment: Some("Foo Bar".to_string()),
                raw_fragment: Some("Foo%20Bar".to_string()),
            }
        );
    }

    #[test]
    fn test_other_schemes_skipped() {
        assert!(matches!(
            classify("ftp://files.example.com/a.tgz"),
            LinkKind::Skip { reason: SkipReason::UnsupportedScheme(s) } if s == "ftp"
        ));
    }

    #[test]
    fn test_colon_in_path_is_not_a_scheme() {
        assert!(matches!(classify("guide/a:b.html"), LinkKind::Internal { .. }));
        assert!(matches!(classify("./x:y"), LinkKind::Internal { .. }));
    }
}
