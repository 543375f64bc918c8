pub mod registry;
pub mod results;
pub mod types;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cnidarium::{Snapshot, StateDelta, StateRead, Storage};
use futures::{Stream, StreamExt};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::canonical::{canonicalize, CanonicalKey, ErrorDescriptor};
use crate::error::{Result, StoreError};
use crate::status::ErrorStatus;

pub use registry::ErrorRegistry;
pub use results::UrlResultStore;
use types::{ErrorRecord, ResolveOptions, ResolvedError, UrlHash, UrlResultEntry};

// Key prefixes, no trailing slashes (cnidarium convention)
const ERROR_PREFIX: &str = "amp/error";
const STATUS_PREFIX: &str = "amp/status";
const URL_PREFIX: &str = "amp/url";

fn error_key(key: &CanonicalKey) -> String {
    format!("{}/{}", ERROR_PREFIX, key)
}
fn status_prefix(status: ErrorStatus) -> String {
    format!("{}/{}:", STATUS_PREFIX, status)
}
fn status_key(status: ErrorStatus, key: &CanonicalKey) -> String {
    format!("{}{}", status_prefix(status), key)
}
fn url_key(hash: &UrlHash) -> String {
    format!("{}/{}", URL_PREFIX, hash)
}

/// Shared handle on the cnidarium storage.
///
/// Every write takes `write_lock` before reading the snapshot it builds its
/// delta on, and holds it through the commit. Insert-if-absent is therefore
/// atomic for all writers sharing this handle.
pub struct Db {
    storage: Storage,
    write_lock: Mutex<()>,
}

impl Db {
    pub async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {:?}", data_dir))?;
        let prefixes = vec![
            ERROR_PREFIX.to_string(),
            STATUS_PREFIX.to_string(),
            URL_PREFIX.to_string(),
        ];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self {
            storage,
            write_lock: Mutex::new(()),
        })
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub(crate) fn delta(&self) -> StateDelta<Snapshot> {
        StateDelta::new(self.storage.latest_snapshot())
    }

    pub(crate) async fn commit(&self, delta: StateDelta<Snapshot>) -> Result<()> {
        self.storage
            .commit(delta)
            .await
            .map_err(StoreError::StorageWrite)?;
        Ok(())
    }

    pub(crate) async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let snapshot = self.storage.latest_snapshot();
        snapshot.get_raw(key).await.map_err(StoreError::Storage)
    }

    /// All `(key, value)` pairs under `prefix`.
    pub(crate) async fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let snapshot = self.storage.latest_snapshot();
        collect_prefix(prefix, snapshot.prefix_raw(prefix)).await
    }

    /// Shut down the underlying storage so the directory can be opened again.
    pub async fn release(self) {
        self.storage.release().await;
    }
}

/// Drain a prefix stream. The first read error aborts the scan.
async fn collect_prefix<S>(prefix: &str, mut stream: S) -> Result<Vec<(String, Vec<u8>)>>
where
    S: Stream<Item = anyhow::Result<(String, Vec<u8>)>> + Unpin,
{
    let mut results = Vec::new();
    while let Some(entry) = stream.next().await {
        match entry {
            Ok(pair) => results.push(pair),
            Err(e) => {
                warn!(prefix, "Error reading prefix stream: {}", e);
                return Err(StoreError::Storage(e));
            }
        }
    }
    Ok(results)
}

/// Both stores behind one handle: the `store` / `resolve` / `set_status`
/// surface consumed by the recheck workflow and the CLI.
pub struct ValidationStore {
    registry: ErrorRegistry,
    results: UrlResultStore,
}

impl ValidationStore {
    pub async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let db = Arc::new(Db::open(data_dir).await?);
        Ok(Self::with_db(db))
    }

    pub fn with_db(db: Arc<Db>) -> Self {
        let registry = ErrorRegistry::new(db.clone());
        let results = UrlResultStore::new(db, registry.clone());
        Self { registry, results }
    }

    pub fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    pub fn results(&self) -> &UrlResultStore {
        &self.results
    }

    /// Close the store. Storage is only released when no other handle shares it.
    pub async fn release(self) {
        let Self { registry, results } = self;
        drop(results);
        match Arc::try_unwrap(registry.into_db()) {
            Ok(db) => db.release().await,
            Err(_) => warn!("storage still shared, leaving it open"),
        }
    }

    /// Store the errors a validator reported for `url`.
    ///
    /// Returns the URL's record id, or `None` when `errors` is empty and any
    /// prior snapshot was removed. Records referenced by a removed snapshot stay
    /// in the registry.
    pub async fn store(&self, errors: &[ErrorDescriptor], url: &str) -> Result<Option<UrlHash>> {
        let mut entries = Vec::with_capacity(errors.len());
        let mut seen: HashSet<CanonicalKey> = HashSet::new();

        for descriptor in errors {
            let (key, canonical) = canonicalize(descriptor);
            if seen.insert(key.clone()) {
                self.registry.get_or_create(&key, &canonical).await?;
            }
            entries.push(UrlResultEntry {
                key,
                sources: descriptor.raw_sources(),
            });
        }

        let distinct = seen.len();
        let hash = self.results.replace(url, entries).await?;
        match &hash {
            Some(hash) => info!(url, url_hash = %hash, errors = errors.len(), distinct, "validation errors stored"),
            None => debug!(url, "no validation errors, snapshot cleared"),
        }
        Ok(hash)
    }

    pub async fn resolve_errors(
        &self,
        url_hash: &UrlHash,
        options: ResolveOptions,
    ) -> Result<Vec<ResolvedError>> {
        self.results.resolve(url_hash, options).await
    }

    pub async fn set_status(&self, key: &CanonicalKey, status: ErrorStatus) -> Result<ErrorRecord> {
        self.registry.set_status(key, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use futures::stream;

    #[tokio::test]
    async fn test_collect_prefix_propagates_read_error() {
        let entries = vec![
            Ok(("amp/url/a".to_string(), vec![1])),
            Err(anyhow!("rocksdb read failed")),
            Ok(("amp/url/b".to_string(), vec![2])),
        ];
        let err = collect_prefix(URL_PREFIX, stream::iter(entries))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(err.to_string().contains("rocksdb read failed"));
    }

    #[tokio::test]
    async fn test_collect_prefix_keeps_order() {
        let entries = vec![
            Ok(("amp/url/a".to_string(), vec![1])),
            Ok(("amp/url/b".to_string(), vec![2])),
        ];
        let pairs = collect_prefix(URL_PREFIX, stream::iter(entries)).await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0, "amp/url/b");
    }
}
