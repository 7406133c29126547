// src/report.rs
// =============================================================================
// This module turns the settled LinkRecords into output.
//
// Two formats:
// - text: broken links grouped by page, then pages that failed to parse,
//   then a summary block and one `summary:` line CI scripts can grep
// - json: the same information as one JSON document
//
// Exit codes: 0 = no broken links, 1 = broken links found
// (2 = configuration/fatal error, decided in main.rs)
// =============================================================================

use crate::checker::{LinkKind, Outcome};
use crate::scan::PageFailure;
use crate::verifier::LinkRecord;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Run-wide counters.
///
/// `ok + broken + skipped + errors == total_links` always holds, because
/// `record` is called exactly once per link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub pages_scanned: usize,
    pub pages_failed: usize,
    pub total_links: usize,
    pub ok: usize,
    pub broken: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Anchor-only and internal path links
    pub internal_links: usize,
    pub external_links: usize,
    /// Distinct external URLs that were actually requested
    pub external_checked: usize,
}

impl Stats {
    pub fn record(&mut self, kind: &LinkKind, outcome: Outcome) {
        self.total_links += 1;
        match outcome {
            Outcome::Ok => self.ok += 1,
            Outcome::Broken => self.broken += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Error => self.errors += 1,
        }
        if kind.is_external() {
            self.external_links += 1;
        } else if kind.is_internal() {
            self.internal_links += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub root: PathBuf,
    pub stats: Stats,
    /// Sorted by (page, href)
    pub records: Vec<LinkRecord>,
    pub failed_pages: Vec<PageFailure>,
}

impl VerificationReport {
    pub fn broken(&self) -> impl Iterator<Item = &LinkRecord> {
        self.with_outcome(Outcome::Broken)
    }

    pub fn errors(&self) -> impl Iterator<Item = &LinkRecord> {
        self.with_outcome(Outcome::Error)
    }

    fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &LinkRecord> {
        self.records.iter().filter(move |r| r.outcome == outcome)
    }

    pub fn is_success(&self) -> bool {
        self.stats.broken == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// The JSON document printed by `--json`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            root: &'a Path,
            stats: &'a Stats,
            broken: Vec<&'a LinkRecord>,
            errors: Vec<&'a LinkRecord>,
            failed_pages: &'a [PageFailure],
        }

        serde_json::to_string_pretty(&JsonReport {
            root: &self.root,
            stats: &self.stats,
            broken: self.broken().collect(),
            errors: self.errors().collect(),
            failed_pages: &self.failed_pages,
        })
    }

    /// Human-readable report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        if self.stats.broken > 0 {
            let _ = writeln!(out, "❌ Broken links:");
            write_grouped(&mut out, self.broken());
        }

        if self.stats.errors > 0 {
            let _ = writeln!(out, "⚠️  Links that could not be checked:");
            write_grouped(&mut out, self.errors());
        }

        if !self.failed_pages.is_empty() {
            let _ = writeln!(out, "📄 Pages that failed to parse:");
            for failure in &self.failed_pages {
                let _ = writeln!(out, "   {}: {}", failure.path.display(), failure.reason);
            }
            let _ = writeln!(out);
        }

        let s = &self.stats;
        let _ = writeln!(out, "📊 Summary:");
        let _ = writeln!(
            out,
            "   📄 Pages: {} ({} failed to parse)",
            s.pages_scanned, s.pages_failed
        );
        let _ = writeln!(
            out,
            "   📋 Links: {} ({} internal, {} external)",
            s.total_links, s.internal_links, s.external_links
        );
        let _ = writeln!(out, "   ✅ OK: {}", s.ok);
        let _ = writeln!(out, "   ❌ Broken: {}", s.broken);
        let _ = writeln!(out, "   ⏭️  Skipped: {}", s.skipped);
        let _ = writeln!(out, "   ⚠️  Errors: {}", s.errors);
        let _ = writeln!(out, "   🌐 External URLs requested: {}", s.external_checked);
        let _ = writeln!(
            out,
            "summary: pages={} failed_pages={} links={} ok={} broken={} skipped={} errors={} external_checked={}",
            s.pages_scanned,
            s.pages_failed,
            s.total_links,
            s.ok,
            s.broken,
            s.skipped,
            s.errors,
            s.external_checked
        );
        out
    }
}

// Records come in (page, href) order, so grouping is a single pass
fn write_grouped<'a>(out: &mut String, records: impl Iterator<Item = &'a LinkRecord>) {
    let mut current: Option<&Path> = None;
    for record in records {
        if current != Some(record.page.as_path()) {
            let _ = writeln!(out, "  {}", record.page.display());
            current = Some(record.page.as_path());
        }
        let _ = writeln!(
            out,
            "    {:<50} {}",
            record.href,
            record.message.as_deref().unwrap_or("")
        );
    }
    let _ = writeln!(out);
}
