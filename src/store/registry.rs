use std::sync::Arc;

use cnidarium::StateWrite;
use tracing::{debug, info, warn};

use super::types::ErrorRecord;
use super::{error_key, status_key, status_prefix, Db, STATUS_PREFIX};
use crate::canonical::{CanonicalDescriptor, CanonicalKey};
use crate::error::{Result, StoreError};
use crate::status::ErrorStatus;
use crate::summary::StatusCounts;

/// Content-addressed store of deduplicated error records.
///
/// Records are never deleted here; one that no URL references any more keeps
/// its status for the next time the error shows up.
#[derive(Clone)]
pub struct ErrorRegistry {
    db: Arc<Db>,
}

impl ErrorRegistry {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    pub(crate) fn into_db(self) -> Arc<Db> {
        self.db
    }

    /// Existing record for `key`, or a new one with status `new`.
    ///
    /// Lookup and insert happen under the storage write lock, so concurrent
    /// callers with the same key all get the one record.
    pub async fn get_or_create(
        &self,
        key: &CanonicalKey,
        descriptor: &CanonicalDescriptor,
    ) -> Result<ErrorRecord> {
        let _guard = self.db.lock().await;
        if let Some(record) = self.find(key).await? {
            return Ok(record);
        }

        let record = ErrorRecord::new(key.clone(), descriptor.clone());
        let mut delta = self.db.delta();
        delta.put_raw(error_key(key), serde_json::to_vec(&record)?);
        // Status index entry (empty value, presence is the index)
        delta.put_raw(status_key(record.status, key), vec![]);
        self.db.commit(delta).await?;

        debug!(key = %key, code = ?record.descriptor.code(), "error record created");
        Ok(record)
    }

    pub async fn get(&self, key: &CanonicalKey) -> Result<ErrorRecord> {
        self.find(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    pub async fn find(&self, key: &CanonicalKey) -> Result<Option<ErrorRecord>> {
        match self.db.get_raw(&error_key(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Move a record to `status`. Fails only with `NotFound`.
    pub async fn set_status(&self, key: &CanonicalKey, status: ErrorStatus) -> Result<ErrorRecord> {
        let _guard = self.db.lock().await;
        let mut record = self.get(key).await?;
        let previous = record.status;
        record.status = previous.transition_to(status)?;
        if previous == record.status {
            return Ok(record);
        }

        let mut delta = self.db.delta();
        delta.put_raw(error_key(key), serde_json::to_vec(&record)?);
        delta.delete(status_key(previous, key));
        delta.put_raw(status_key(record.status, key), vec![]);
        self.db.commit(delta).await?;

        info!(key = %key, from = %previous, to = %record.status, "validation error status changed");
        Ok(record)
    }

    /// Records in `status`, newest first.
    pub async fn query_by_status(&self, status: ErrorStatus) -> Result<Vec<ErrorRecord>> {
        let prefix = status_prefix(status);
        let mut results = Vec::new();

        for (index_key, _) in self.db.scan(&prefix).await? {
            // Key format: "amp/status/{status}:{key}"
            let Some(key) = index_key.strip_prefix(&prefix).and_then(CanonicalKey::parse) else {
                warn!(index_key = %index_key, "Malformed status index key");
                continue;
            };
            match self.find(&key).await {
                Ok(Some(record)) => results.push(record),
                Ok(None) => warn!(key = %key, "status index points at missing record"),
                Err(e) => warn!(key = %key, "Failed to load error record: {}", e),
            }
        }

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    /// Number of records per status, from the status index.
    pub async fn count_by_status(&self) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();
        for (index_key, _) in self.db.scan(STATUS_PREFIX).await? {
            let status = index_key
                .strip_prefix(STATUS_PREFIX)
                .and_then(|rest| rest.trim_start_matches('/').split(':').next())
                .and_then(|name| name.parse::<ErrorStatus>().ok());
            if let Some(status) = status {
                counts.add(status);
            }
        }
        Ok(counts)
    }
}
