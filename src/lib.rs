//! Deduplicated store of validation errors reported for a set of URLs.
//!
//! ```text
//! validator ──> canonical ──> ErrorRegistry  (one record per canonical key, with status)
//!                  │
//!                  └────────> UrlResultStore (per-URL snapshot: keys + sources)
//! ```
//!
//! [`recheck::RecheckCoordinator`] drives the validator and reconciles both
//! stores; [`summary::SummaryAggregator`] reads them.

pub mod canonical;
pub mod config;
pub mod error;
pub mod recheck;
pub mod state;
pub mod status;
pub mod store;
pub mod summary;
pub mod validator;

pub use canonical::{canonicalize, source_list, CanonicalDescriptor, CanonicalKey, ErrorDescriptor, SourceContext};
pub use error::{RecheckError, StoreError, ValidatorError};
pub use recheck::{BatchOutcome, RecheckCoordinator, RecheckOutcome, RedirectParams};
pub use status::ErrorStatus;
pub use store::types::{
    ErrorRecord, ResolveOptions, ResolvedError, UrlHash, UrlResultEntry, UrlValidationResult,
};
pub use store::{ErrorRegistry, UrlResultStore, ValidationStore};
pub use summary::{GroupedSummary, StatusCounts, SummaryAggregator};
pub use validator::{HttpValidator, Validator};
