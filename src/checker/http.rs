// src/checker/http.rs
// =============================================================================
// This module checks if external URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when the server rejects HEAD (405 / 501)
// - Retries timeouts and connection failures with exponential backoff
// - Remembers every result, so a URL linked from 50 pages costs 1 request
// - Runs distinct URLs concurrently, with a cap and an optional deadline
//
// Rust concepts:
// - async/await: For concurrent network I/O
// - OnceCell: the first caller for a URL runs the check, later callers wait
//   for that same result instead of sending their own request
// - Streams: buffer_unordered for bounded concurrency
// =============================================================================

use crate::config::RetryPolicy;
use crate::error::ConfigError;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

pub const DEADLINE_EXCEEDED: &str = "global timeout exceeded";

/// How an external check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Final response was 2xx or 3xx
    Ok,
    /// Final response was 4xx or 5xx
    HttpError,
    /// Request timed out (after all retries)
    Timeout,
    /// SSL/TLS certificate error
    SslError,
    /// Too many redirects (redirect loop)
    TooManyRedirects,
    /// Could not resolve hostname
    DnsError,
    /// Connection refused / reset
    ConnectionError,
    /// The href is not a parseable URL
    InvalidUrl,
    /// The run's time budget ran out before this URL was checked
    DeadlineExceeded,
    /// Other error
    Error,
}

impl LinkStatus {
    /// Failures worth another attempt.
    fn is_transient(self) -> bool {
        matches!(
            self,
            LinkStatus::Timeout | LinkStatus::ConnectionError | LinkStatus::DnsError
        )
    }
}

/// The result of checking one external URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalCheck {
    /// The URL that was checked (normalized)
    pub url: String,
    pub status: LinkStatus,
    /// Final HTTP status code, if a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Number of request rounds made (1 + retries used)
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExternalCheck {
    pub fn is_ok(&self) -> bool {
        self.status == LinkStatus::Ok
    }

    fn failed(url: String, status: LinkStatus, message: String, attempts: u32) -> Self {
        Self {
            url,
            status,
            http_status: None,
            attempts,
            message: Some(message),
        }
    }

    pub fn deadline_exceeded(url: String) -> Self {
        Self::failed(url, LinkStatus::DeadlineExceeded, DEADLINE_EXCEEDED.to_string(), 0)
    }
}

/// Normalized URL -> result.
///
/// Each URL gets its own `OnceCell`. The mutex is only held long enough to
/// fetch or create the cell, never across a network request.
#[derive(Debug, Default)]
pub struct ExternalCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<ExternalCheck>>>>,
}

impl ExternalCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<OnceCell<ExternalCheck>> {
        self.entries
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Number of URLs with a finished result.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strips the fragment (never sent to the server) and gives protocol-relative
/// URLs a scheme.
pub fn normalize_url(raw: &str) -> Result<String, url::ParseError> {
    let absolute = if raw.starts_with("//") {
        format!("https:{}", raw)
    } else {
        raw.to_string()
    };
    let mut url = Url::parse(&absolute)?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Checks external URLs with a shared client and cache.
#[derive(Debug)]
pub struct ExternalChecker {
    client: Client,
    retry: RetryPolicy,
    cache: Arc<ExternalCache>,
    // URLs that actually went to the network (cache misses)
    network_checks: AtomicUsize,
}

impl ExternalChecker {
    pub fn new(client: Client, retry: RetryPolicy, cache: Arc<ExternalCache>) -> Self {
        Self {
            client,
            retry,
            cache,
            network_checks: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<ExternalCache> {
        &self.cache
    }

    /// How many distinct URLs were checked over the network by this checker.
    pub fn network_checks(&self) -> usize {
        self.network_checks.load(Ordering::Relaxed)
    }

    /// Verifies one URL, reusing the cached result when there is one.
    ///
    /// Concurrent calls for the same URL share a single request.
    pub async fn verify_external_link(&self, url: &str) -> ExternalCheck {
        let key = match normalize_url(url) {
            Ok(key) => key,
            Err(e) => {
                return ExternalCheck::failed(
                    url.to_string(),
                    LinkStatus::InvalidUrl,
                    format!("invalid URL: {}", e),
                    0,
                )
            }
        };

        let slot = self.cache.slot(&key);
        slot.get_or_init(|| self.check_uncached(key.clone()))
            .await
            .clone()
    }

    /// Checks many URLs, at most `concurrency` at a time.
    ///
    /// With a `deadline`, URLs still unfinished when it expires come back as
    /// `DeadlineExceeded`. Every input URL has an entry in the returned map.
    pub async fn check_all(
        &self,
        urls: Vec<String>,
        concurrency: usize,
        deadline: Option<Duration>,
    ) -> HashMap<String, ExternalCheck> {
        let mut results = HashMap::with_capacity(urls.len());

        {
            let checks = stream::iter(urls.iter().cloned())
                .map(|url| async move {
                    let check = self.verify_external_link(&url).await;
                    (url, check)
                })
                .buffer_unordered(concurrency.max(1));
            tokio::pin!(checks);

            match deadline {
                None => {
                    while let Some((url, check)) = checks.next().await {
                        results.insert(url, check);
                    }
                }
                Some(budget) => {
                    let expired = tokio::time::sleep(budget);
                    tokio::pin!(expired);
                    loop {
                        tokio::select! {
                            next = checks.next() => match next {
                                Some((url, check)) => {
                                    results.insert(url, check);
                                }
                                None => break,
                            },
                            _ = &mut expired => {
                                tracing::warn!(
                                    budget_secs = budget.as_secs_f64(),
                                    unfinished = urls.len() - results.len(),
                                    "external check deadline reached"
                                );
                                break;
                            }
                        }
                    }
                }
            }
            // dropping the stream cancels whatever is still in flight
        }

        for url in urls {
            results
                .entry(url.clone())
                .or_insert_with(|| ExternalCheck::deadline_exceeded(url));
        }
        results
    }

    // The network part: attempts with retry and backoff
    async fn check_uncached(&self, url: String) -> ExternalCheck {
        self.network_checks.fetch_add(1, Ordering::Relaxed);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.request(&url).await {
                Ok(status) => {
                    tracing::debug!(%url, status = status.as_u16(), attempt, "external link checked");
                    return analyze_status(url, status, attempt);
                }
                Err(e) => {
                    let (status, message) = categorize_error(&e);
                    if status.is_transient() && attempt <= self.retry.retries {
                        let wait = self.retry.delay_for(attempt);
                        tracing::warn!(
                            %url,
                            attempt,
                            max_attempts = self.retry.retries + 1,
                            error = %message,
                            "request failed, retrying in {:?}",
                            wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    tracing::debug!(%url, attempt, error = %message, "external link failed");
                    return ExternalCheck::failed(url, status, message, attempt);
                }
            }
        }
    }

    // HEAD first; GET when the server says HEAD isn't supported
    async fn request(&self, url: &str) -> Result<StatusCode, reqwest::Error> {
        let head = self.client.head(url).send().await?;
        let status = head.status();
        if !head_unsupported(status) {
            return Ok(status);
        }
        tracing::debug!(%url, status = status.as_u16(), "HEAD rejected, retrying with GET");
        let get = self.client.get(url).send().await?;
        Ok(get.status())
    }
}

pub fn build_client(request_timeout: Duration) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(request_timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(concat!("link-verifier/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

fn head_unsupported(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    )
}

// 2xx and 3xx are fine; anything else is broken
fn analyze_status(url: String, status: StatusCode, attempts: u32) -> ExternalCheck {
    let link_status = if status.is_success() || status.is_redirection() {
        LinkStatus::Ok
    } else {
        LinkStatus::HttpError
    };
    ExternalCheck {
        url,
        status: link_status,
        http_status: Some(status.as_u16()),
        attempts,
        message: Some(format!("HTTP {}", status.as_u16())),
    }
}

// Maps a reqwest error to a status and a message that keeps the root cause
fn categorize_error(error: &reqwest::Error) -> (LinkStatus, String) {
    let causes = error_causes(error);
    let detail = if causes.is_empty() {
        error.to_string()
    } else {
        format!("{}: {}", error, causes)
    };
    // Only look at the causes: the top-level message contains the URL itself
    let lowered = causes.to_lowercase();

    if error.is_timeout() {
        (LinkStatus::Timeout, "request timed out".to_string())
    } else if error.is_redirect() {
        (LinkStatus::TooManyRedirects, "too many redirects".to_string())
    } else if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl") {
        (LinkStatus::SslError, format!("SSL error: {}", causes))
    } else if error.is_connect() {
        if lowered.contains("dns") || lowered.contains("resolve") || lowered.contains("lookup") {
            (LinkStatus::DnsError, format!("could not resolve hostname: {}", causes))
        } else {
            (LinkStatus::ConnectionError, format!("connection failed: {}", causes))
        }
    } else {
        (LinkStatus::Error, detail)
    }
}

// reqwest's Display hides the interesting part in source()
fn error_causes(error: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
