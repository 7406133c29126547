// src/config.rs
// =============================================================================
// Validated configuration for a verification run.
//
// The CLI (src/cli.rs) produces one of these, but tests and other tools can
// build it directly with `VerifierConfig::new(root)` and tweak the fields.
// `validate()` must pass before a `Verifier` is created; it is where every
// ConfigError is raised, so nothing is scanned with a bad configuration.
// =============================================================================

use crate::error::ConfigError;
use crate::scan::Excludes;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Directories that static-site generators use for caches and sources.
/// They never hold pages a reader can navigate to.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".doctrees",
    "_sources",
    "__pycache__",
    ".git",
    "node_modules",
    ".cache",
];

/// An attribute that marks an `<a href="#">` as a widget trigger
/// (dropdown toggle, tab button) instead of a navigation link.
///
/// `value: None` matches the attribute with any value except "false".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiMarker {
    pub attribute: String,
    pub value: Option<String>,
}

impl UiMarker {
    pub fn attr(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_ascii_lowercase(),
            value: None,
        }
    }

    pub fn attr_eq(attribute: &str, value: &str) -> Self {
        Self {
            attribute: attribute.to_ascii_lowercase(),
            value: Some(value.to_string()),
        }
    }

    /// Checks the marker against one attribute of an element.
    pub fn matches(&self, name: &str, value: &str) -> bool {
        if !name.eq_ignore_ascii_case(&self.attribute) {
            return false;
        }
        match &self.value {
            Some(expected) => value.trim().eq_ignore_ascii_case(expected),
            None => !value.trim().eq_ignore_ascii_case("false"),
        }
    }

    /// The markers used when the user doesn't configure any.
    ///
    /// This list is a heuristic. A real broken `#` link that happens to carry
    /// one of these attributes will be skipped instead of reported.
    pub fn defaults() -> Vec<UiMarker> {
        vec![
            UiMarker::attr("aria-haspopup"),
            UiMarker::attr_eq("role", "button"),
            UiMarker::attr("data-toggle"),
            UiMarker::attr("data-bs-toggle"),
        ]
    }
}

impl std::fmt::Display for UiMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.attribute, value),
            None => write!(f, "{}", self.attribute),
        }
    }
}

// Parses "aria-haspopup" or "role=button"
impl FromStr for UiMarker {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('=') {
            Some((attr, value)) if !attr.trim().is_empty() && !value.trim().is_empty() => {
                Ok(UiMarker::attr_eq(attr.trim(), value.trim()))
            }
            None if !s.is_empty() && !s.contains(char::is_whitespace) => Ok(UiMarker::attr(s)),
            _ => Err(ConfigError::InvalidUiMarker(s.to_string())),
        }
    }
}

/// How external requests are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Root of the built site.
    pub root: PathBuf,
    pub skip_external: bool,
    pub only_external: bool,
    pub retry: RetryPolicy,
    /// Maximum number of external URLs checked at the same time.
    pub concurrency: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Budget for the whole external phase. `None` = no limit.
    pub timeout: Option<Duration>,
    /// Public URL of the site; absolute links to its host are internal.
    pub site_url: Option<String>,
    /// Glob patterns (relative to root) for paths that are not scanned.
    pub excludes: Vec<String>,
    pub ui_markers: Vec<UiMarker>,
}

impl VerifierConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_external: false,
            only_external: false,
            retry: RetryPolicy::default(),
            concurrency: 8,
            request_timeout: Duration::from_secs(10),
            timeout: None,
            site_url: None,
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            ui_markers: UiMarker::defaults(),
        }
    }

    /// Checks every setting that can make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skip_external && self.only_external {
            return Err(ConfigError::ConflictingModes);
        }
        if !self.root.exists() {
            return Err(ConfigError::RootNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotADirectory(self.root.clone()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Excludes::new(&self.excludes)?;
        self.site_base()?;
        Ok(())
    }

    /// `site_url` parsed. Its host and path together say which absolute
    /// links point back into the build directory.
    pub fn site_base(&self) -> Result<Option<Url>, ConfigError> {
        let Some(raw) = &self.site_url else {
            return Ok(None);
        };
        let invalid = |message: String| ConfigError::InvalidSiteUrl {
            url: raw.clone(),
            message,
        };
        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if url.host_str().is_none() {
            return Err(invalid("URL has no host".to_string()));
        }
        Ok(Some(url))
    }
}
