// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - classify: decides whether an href is an anchor, internal, external or skipped
// - anchor: anchor-id sets and fragment decoding
// - internal: resolves internal links against the build directory
// - http: checks external links over the network
//
// Every check ends in a `Verdict`: one terminal outcome plus an optional
// message explaining it.
// =============================================================================

mod anchor;
mod classify;
mod http;
mod internal;

pub use anchor::{decode_fragment, has_anchor, AnchorEntry, AnchorIndex, AnchorSet};
pub use classify::{Classifier, LinkKind, SkipReason};
pub use http::{
    build_client, normalize_url, ExternalCache, ExternalCheck, ExternalChecker, LinkStatus,
    DEADLINE_EXCEEDED,
};
pub use internal::{
    check_same_document, locate_target, InternalResolver, ANCHOR_NOT_FOUND, TARGET_NOT_FOUND,
};

use serde::Serialize;

/// Terminal state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Broken,
    Skipped,
    /// The link could not be evaluated (e.g. its target page failed to parse).
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub message: Option<String>,
}

impl Verdict {
    pub fn ok() -> Self {
        Self {
            outcome: Outcome::Ok,
            message: None,
        }
    }

    pub fn broken(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Broken,
            message: Some(message.into()),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Skipped,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Error,
            message: Some(message.into()),
        }
    }
}
