use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{source_list, CanonicalDescriptor, CanonicalKey, ErrorDescriptor, SourceContext};
use crate::status::ErrorStatus;

/// Identity of a URL snapshot (blake3 hex of the URL string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlHash(String);

impl UrlHash {
    pub fn of(url: &str) -> Self {
        Self(blake3::hash(url.as_bytes()).to_hex().to_string())
    }

    /// Wrap an already-computed hash, e.g. one read back from a listing.
    pub fn from_hex(hex: &str) -> Self {
        Self(hex.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicated, globally shared record for one canonical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub key: CanonicalKey,
    pub descriptor: CanonicalDescriptor,
    pub status: ErrorStatus,
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

impl ErrorRecord {
    pub fn new(key: CanonicalKey, descriptor: CanonicalDescriptor) -> Self {
        Self {
            key,
            descriptor,
            status: ErrorStatus::New,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Reference from a URL snapshot to an error record, with the instance context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlResultEntry {
    pub key: CanonicalKey,
    /// The instance's `sources` field as reported, `None` when it had none.
    #[serde(default)]
    pub sources: Option<Value>,
}

/// Current full snapshot of the errors applicable to one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlValidationResult {
    pub url: String,
    /// In the order the validator returned them.
    pub entries: Vec<UrlResultEntry>,
    #[serde(rename = "checkedAt")]
    pub checked_at: i64,
}

impl UrlValidationResult {
    pub fn url_hash(&self) -> UrlHash {
        UrlHash::of(&self.url)
    }
}

/// An entry joined against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedError {
    pub record: ErrorRecord,
    pub sources: Option<Value>,
}

impl ResolvedError {
    pub fn status(&self) -> ErrorStatus {
        self.record.status
    }

    /// Canonical descriptor merged with this instance's sources.
    pub fn descriptor(&self) -> ErrorDescriptor {
        self.record.descriptor.with_sources(self.sources.as_ref())
    }

    pub fn source_list(&self) -> Vec<SourceContext> {
        source_list(self.sources.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub exclude_ignored: bool,
}
