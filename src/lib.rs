//! Static-site link verifier.
//!
//! Scans a directory of generated HTML, resolves internal links and anchors
//! against the filesystem, checks external links over HTTP, and reports what
//! is broken.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use link_verifier::{Verifier, VerifierConfig};
//!
//! let mut config = VerifierConfig::new("site/_build/html");
//! config.skip_external = true;
//! let report = Verifier::new(config)?.run().await?;
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod cli;
pub mod config;
pub mod error;
pub mod report;
pub mod scan;
pub mod verifier;

pub use checker::{ExternalCache, ExternalCheck, ExternalChecker, LinkKind, LinkStatus, Outcome};
pub use config::{RetryPolicy, UiMarker, VerifierConfig};
pub use error::{ConfigError, ParseError, VerifierError};
pub use report::{Stats, VerificationReport};
pub use verifier::{LinkRecord, Verifier};
