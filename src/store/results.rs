use std::sync::Arc;

use cnidarium::StateWrite;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::registry::ErrorRegistry;
use super::types::{ResolveOptions, ResolvedError, UrlHash, UrlResultEntry, UrlValidationResult};
use super::{url_key, Db, URL_PREFIX};
use crate::error::Result;
use crate::status::ErrorStatus;

/// Per-URL snapshots of which deduplicated errors currently apply.
#[derive(Clone)]
pub struct UrlResultStore {
    db: Arc<Db>,
    registry: ErrorRegistry,
}

/// Lenient view of a persisted snapshot; `entries` is decoded separately.
#[derive(Deserialize)]
struct StoredResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    entries: Value,
    #[serde(default, rename = "checkedAt")]
    checked_at: i64,
}

impl UrlResultStore {
    pub fn new(db: Arc<Db>, registry: ErrorRegistry) -> Self {
        Self { db, registry }
    }

    /// Replace the snapshot for `url` with exactly `entries`.
    ///
    /// Empty `entries` deletes the snapshot and returns `None`. Entries of the
    /// previous run that are not in `entries` are dropped; the registry is not
    /// touched.
    pub async fn replace(&self, url: &str, entries: Vec<UrlResultEntry>) -> Result<Option<UrlHash>> {
        let hash = UrlHash::of(url);
        let key = url_key(&hash);
        let _guard = self.db.lock().await;

        if entries.is_empty() {
            if self.db.get_raw(&key).await?.is_some() {
                let mut delta = self.db.delta();
                delta.delete(key);
                self.db.commit(delta).await?;
                debug!(url, url_hash = %hash, "url snapshot deleted");
            }
            return Ok(None);
        }

        let result = UrlValidationResult {
            url: url.to_string(),
            entries,
            checked_at: chrono::Utc::now().timestamp(),
        };
        let mut delta = self.db.delta();
        delta.put_raw(key, serde_json::to_vec(&result)?);
        self.db.commit(delta).await?;

        debug!(url, url_hash = %hash, entries = result.entries.len(), "url snapshot replaced");
        Ok(Some(hash))
    }

    pub async fn get(&self, url_hash: &UrlHash) -> Result<Option<UrlValidationResult>> {
        Ok(self
            .db
            .get_raw(&url_key(url_hash))
            .await?
            .map(|bytes| decode_result(url_hash, &bytes)))
    }

    /// Join the snapshot's entries against the registry, in stored order.
    ///
    /// An unknown URL resolves to no errors. Entries whose record is missing
    /// or unreadable are skipped.
    pub async fn resolve(
        &self,
        url_hash: &UrlHash,
        options: ResolveOptions,
    ) -> Result<Vec<ResolvedError>> {
        let Some(result) = self.get(url_hash).await? else {
            return Ok(Vec::new());
        };

        let mut resolved = Vec::with_capacity(result.entries.len());
        for entry in result.entries {
            let record = match self.registry.find(&entry.key).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!(url_hash = %url_hash, key = %entry.key, "entry references unknown error record");
                    continue;
                }
                Err(e) => {
                    warn!(url_hash = %url_hash, key = %entry.key, "Failed to load error record: {}", e);
                    continue;
                }
            };
            if options.exclude_ignored && record.status == ErrorStatus::Ignored {
                continue;
            }
            resolved.push(ResolvedError {
                record,
                sources: entry.sources,
            });
        }

        Ok(resolved)
    }

    /// All stored snapshots, most recently checked first.
    pub async fn list(&self, limit: usize) -> Result<Vec<UrlValidationResult>> {
        let prefix = format!("{}/", URL_PREFIX);
        let mut results: Vec<UrlValidationResult> = self
            .db
            .scan(URL_PREFIX)
            .await?
            .into_iter()
            .map(|(key, bytes)| {
                let hash = UrlHash::from_hex(key.strip_prefix(&prefix).unwrap_or(&key));
                decode_result(&hash, &bytes)
            })
            .collect();

        results.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        results.truncate(limit);
        Ok(results)
    }
}

/// Decode a persisted snapshot. A corrupt record degrades to an empty entry
/// list instead of failing the read.
fn decode_result(url_hash: &UrlHash, bytes: &[u8]) -> UrlValidationResult {
    let stored = match serde_json::from_slice::<StoredResult>(bytes) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(url_hash = %url_hash, "Unreadable url snapshot, treating as empty: {}", e);
            return UrlValidationResult {
                url: String::new(),
                entries: Vec::new(),
                checked_at: 0,
            };
        }
    };

    let entries = match stored.entries {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<UrlResultEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(url_hash = %url_hash, "Skipping malformed snapshot entry: {}", e);
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(url_hash = %url_hash, kind = ?other, "Snapshot entries are not a list, treating as empty");
            Vec::new()
        }
    };

    UrlValidationResult {
        url: stored.url,
        entries,
        checked_at: stored.checked_at,
    }
}
