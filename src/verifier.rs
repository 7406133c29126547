// src/verifier.rs
// =============================================================================
// This module runs a full verification pass over a build directory.
//
// What happens in `Verifier::run`:
// 1. Scan: find and parse every page (failures are recorded, not fatal)
// 2. Classify every link on every page
// 3. Resolve anchor-only and internal links against the filesystem
// 4. Check the distinct external URLs concurrently
// 5. Sort the records by (page, href) and hand them to the report
//
// All mutable run state (anchor index, stats, records) lives in a
// `RunContext`, and the external cache in an `ExternalChecker`. Both are
// created fresh by each call to `run`, so a `Verifier` can be run any number
// of times in one process and every run starts clean.
// =============================================================================

use crate::checker::{
    build_client, check_same_document, AnchorIndex, Classifier, ExternalCache, ExternalChecker,
    InternalResolver, LinkKind, Outcome, Verdict,
};
use crate::config::VerifierConfig;
use crate::error::{ConfigError, VerifierError};
use crate::report::{Stats, VerificationReport};
use crate::scan::{self, Excludes, Page};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A link that has been classified but not yet checked.
#[derive(Debug, Clone)]
pub struct PendingLink {
    /// Source page, relative to the build root
    pub page: PathBuf,
    pub href: String,
    pub kind: LinkKind,
}

/// One link occurrence with its final outcome.
///
/// Only `RunContext::settle` creates these, which is what guarantees every
/// link ends with exactly one outcome and is counted exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub page: PathBuf,
    pub href: String,
    #[serde(flatten)]
    pub kind: LinkKind,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Mutable state for one run.
#[derive(Debug, Default)]
pub struct RunContext {
    pub anchors: AnchorIndex,
    pub stats: Stats,
    pub records: Vec<LinkRecord>,
}

impl RunContext {
    /// Gives a pending link its terminal outcome and counts it.
    pub fn settle(&mut self, link: PendingLink, verdict: Verdict) {
        self.stats.record(&link.kind, verdict.outcome);
        self.records.push(LinkRecord {
            page: link.page,
            href: link.href,
            kind: link.kind,
            outcome: verdict.outcome,
            message: verdict.message,
        });
    }
}

pub struct Verifier {
    config: VerifierConfig,
    root: PathBuf,
    excludes: Excludes,
    classifier: Classifier,
    client: reqwest::Client,
}

impl Verifier {
    /// Validates the configuration. Nothing is read from the build directory
    /// yet, but a bad configuration is rejected here.
    pub fn new(config: VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        // Canonical root: every page path starts with it, and internal
        // resolution compares against it to reject "../../" escapes
        let root = config
            .root
            .canonicalize()
            .map_err(|_| ConfigError::RootNotFound(config.root.clone()))?;
        let excludes = Excludes::new(&config.excludes)?;
        let classifier = Classifier::new(config.site_base()?.as_ref());
        let client = build_client(config.request_timeout)?;

        Ok(Self {
            config,
            root,
            excludes,
            classifier,
            client,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs one complete verification pass.
    pub async fn run(&self) -> Result<VerificationReport, VerifierError> {
        let scanned = scan::scan_site(&self.root, &self.excludes, &self.config.ui_markers)?;
        tracing::info!(
            pages = scanned.pages.len(),
            failed = scanned.failures.len(),
            "scan complete"
        );

        let mut ctx = RunContext {
            anchors: AnchorIndex::from_pages(&scanned.pages),
            ..RunContext::default()
        };
        ctx.stats.pages_scanned = scanned.pages.len();
        ctx.stats.pages_failed = scanned.failures.len();
        for failure in &scanned.failures {
            ctx.anchors
                .mark_failed(failure.path.clone(), failure.reason.clone());
        }

        let external = self.check_local(&mut ctx, &scanned.pages);
        self.check_external(&mut ctx, external).await;

        // Completion order of network checks must not leak into the report
        ctx.records
            .sort_by(|a, b| a.page.cmp(&b.page).then_with(|| a.href.cmp(&b.href)));

        let failed_pages = scanned
            .failures
            .into_iter()
            .map(|mut failure| {
                failure.path = self.relative(&failure.path);
                failure
            })
            .collect();

        Ok(VerificationReport {
            root: self.root.clone(),
            stats: ctx.stats,
            records: ctx.records,
            failed_pages,
        })
    }

    // Classifies every link and settles everything that doesn't need the
    // network. Returns the external links still waiting for a check.
    fn check_local(&self, ctx: &mut RunContext, pages: &[Page]) -> Vec<PendingLink> {
        let mut external = Vec::new();

        for page in pages {
            let relative = self.relative(&page.path);
            for raw_link in &page.links {
                let link = PendingLink {
                    page: relative.clone(),
                    href: raw_link.href.clone(),
                    kind: self.classifier.classify(raw_link),
                };

                let verdict = match &link.kind {
                    LinkKind::Skip { reason } => Some(Verdict::skipped(reason.to_string())),
                    LinkKind::External { .. } if self.config.skip_external => {
                        Some(Verdict::skipped("external checks disabled"))
                    }
                    LinkKind::External { .. } => None,
                    _ if self.config.only_external => {
                        Some(Verdict::skipped("internal checks disabled"))
                    }
                    LinkKind::Anchor { fragment, raw } => {
                        Some(check_same_document(page, fragment, raw))
                    }
                    LinkKind::Internal {
                        path,
                        absolute,
                        fragment,
                        raw_fragment,
                    } => Some(InternalResolver::new(&self.root, &mut ctx.anchors).check(
                        page,
                        path,
                        *absolute,
                        fragment.as_deref(),
                        raw_fragment.as_deref(),
                    )),
                };

                match verdict {
                    Some(verdict) => {
                        tracing::debug!(
                            page = %link.page.display(),
                            href = %link.href,
                            outcome = ?verdict.outcome,
                            "link checked"
                        );
                        ctx.settle(link, verdict);
                    }
                    None => external.push(link),
                }
            }
        }

        external
    }

    async fn check_external(&self, ctx: &mut RunContext, pending: Vec<PendingLink>) {
        if pending.is_empty() {
            return;
        }

        // One entry per distinct URL; the cache would dedupe anyway, but this
        // keeps the concurrency budget for URLs that actually need a request
        let urls: Vec<String> = pending
            .iter()
            .filter_map(|link| match &link.kind {
                LinkKind::External { url } => Some(url.clone()),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        tracing::info!(
            links = pending.len(),
            urls = urls.len(),
            concurrency = self.config.concurrency,
            "checking external links"
        );

        let checker = ExternalChecker::new(
            self.client.clone(),
            self.config.retry.clone(),
            Arc::new(ExternalCache::new()),
        );
        let results = checker
            .check_all(urls, self.config.concurrency, self.config.timeout)
            .await;
        ctx.stats.external_checked = checker.network_checks();

        for link in pending {
            let check = match &link.kind {
                LinkKind::External { url } => results.get(url),
                _ => None,
            };
            let verdict = match check {
                Some(check) if check.is_ok() => Verdict {
                    outcome: Outcome::Ok,
                    message: check.message.clone(),
                },
                Some(check) => Verdict::broken(
                    check
                        .message
                        .clone()
                        .unwrap_or_else(|| "request failed".to_string()),
                ),
                None => Verdict::error("external link was not checked"),
            };
            ctx.settle(link, verdict);
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
