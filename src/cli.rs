// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the struct below *is* the CLI definition. Every
// flag can also come from a LINK_VERIFIER_* environment variable, which is
// handy in CI where the command line lives in a YAML file.
//
// The parsed `Cli` is converted into a `VerifierConfig` (src/config.rs),
// which is what the library actually works with.
// =============================================================================

use crate::config::{RetryPolicy, UiMarker, VerifierConfig, DEFAULT_EXCLUDES};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "link-verifier",
    version,
    about = "Verify the links in a built static site",
    long_about = "link-verifier scans a directory of generated HTML pages and reports broken links. \
                  Internal links and anchors are resolved against the filesystem; external links \
                  are checked over HTTP. It exits with 1 when broken links are found, so it drops \
                  straight into a CI pipeline."
)]
pub struct Cli {
    /// Build directory to scan (e.g. _build/html)
    pub root: PathBuf,

    /// Don't check external links (fast, offline)
    #[arg(long, env = "LINK_VERIFIER_SKIP_EXTERNAL", conflicts_with = "only_external")]
    pub skip_external: bool,

    /// Only check external links (network audit)
    #[arg(long, env = "LINK_VERIFIER_ONLY_EXTERNAL")]
    pub only_external: bool,

    /// Extra attempts for external requests that time out or fail to connect
    #[arg(long, env = "LINK_VERIFIER_RETRIES", default_value_t = 2)]
    pub retries: u32,

    /// Delay before the first retry, in milliseconds (doubles each retry)
    #[arg(long, env = "LINK_VERIFIER_BACKOFF_MS", default_value_t = 500)]
    pub backoff_ms: u64,

    /// Maximum number of external URLs checked at the same time
    #[arg(long, env = "LINK_VERIFIER_CONCURRENCY", default_value_t = 8)]
    pub concurrency: usize,

    /// Time budget in seconds for all external checks; unfinished URLs are reported broken
    #[arg(long, env = "LINK_VERIFIER_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Timeout in seconds for a single HTTP request
    #[arg(long, env = "LINK_VERIFIER_REQUEST_TIMEOUT", default_value_t = 10)]
    pub request_timeout: u64,

    /// Public URL of the site; absolute links to this host are checked on disk
    #[arg(long, env = "LINK_VERIFIER_SITE_URL")]
    pub site_url: Option<String>,

    /// Glob of paths (relative to ROOT) to leave out; repeatable. Replaces the defaults
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Attribute marking `<a href="#">` as a UI trigger, as ATTR or ATTR=VALUE;
    /// repeatable. Replaces the defaults
    #[arg(long = "ui-marker", value_name = "ATTR[=VALUE]")]
    pub ui_markers: Vec<UiMarker>,

    /// Output results in JSON format instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn into_config(self) -> VerifierConfig {
        let mut config = VerifierConfig::new(self.root);
        config.skip_external = self.skip_external;
        config.only_external = self.only_external;
        config.retry = RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
            ..RetryPolicy::default()
        };
        config.concurrency = self.concurrency;
        config.timeout = self.timeout.map(Duration::from_secs);
        config.request_timeout = Duration::from_secs(self.request_timeout);
        config.site_url = self.site_url;
        config.excludes = if self.excludes.is_empty() {
            DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
        } else {
            self.excludes
        };
        if !self.ui_markers.is_empty() {
            config.ui_markers = self.ui_markers;
        }
        config
    }
}
