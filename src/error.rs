// src/error.rs
// =============================================================================
// Error types for the verifier library.
//
// Only configuration problems abort a run. Everything that goes wrong with a
// single page or a single link is captured in the report instead:
// - ParseError: a page could not be read, it shows up under "failed pages"
// - broken internal targets and network failures become broken LinkRecords
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Problems detected before scanning starts. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--skip-external and --only-external cannot be used together")]
    ConflictingModes,
    #[error("build directory does not exist: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("build directory is not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidExclude { pattern: String, message: String },
    #[error("invalid site URL '{url}': {message}")]
    InvalidSiteUrl { url: String, message: String },
    #[error("invalid UI marker '{0}': expected ATTR or ATTR=VALUE")]
    InvalidUiMarker(String),
    #[error("could not build HTTP client: {0}")]
    HttpClient(String),
}

/// A single page that could not be turned into a `Page`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("page is not valid UTF-8 (first bad byte at offset {0})")]
    Encoding(usize),
}

/// Top-level error returned by `Verifier::run`.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to walk build directory: {0}")]
    Walk(String),
}
