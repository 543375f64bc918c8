//! Re-run the external validator and reconcile the stores.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{RecheckError, StoreError};
use crate::store::types::UrlHash;
use crate::store::ValidationStore;
use crate::validator::Validator;

/// Query arg carrying how many URLs were rechecked.
pub const URLS_TESTED_ARG: &str = "amp_urls_tested";
/// Query arg carrying whether any rechecked URL still has errors.
pub const REMAINING_ERRORS_ARG: &str = "amp_remaining_errors";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecheckOutcome {
    /// Always 1: a failed recheck is an `Err`, not an outcome.
    pub tested: usize,
    /// The validator still reports at least one error, whatever its status.
    pub has_remaining_errors: bool,
    /// Snapshot id, `None` when the snapshot was cleared.
    pub result: Option<UrlHash>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// URLs successfully re-validated and stored.
    pub tested: usize,
    pub any_remaining_errors: bool,
    /// URLs left untouched because validation or storage failed.
    pub failed: Vec<String>,
}

/// What the caller needs to report the recheck back to a list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectParams {
    pub urls_tested: String,
    pub remaining_errors: String,
}

impl RedirectParams {
    fn new(tested: usize, remaining: bool) -> Self {
        Self {
            urls_tested: tested.to_string(),
            remaining_errors: if remaining { "1" } else { "0" }.to_string(),
        }
    }

    pub fn to_query(&self) -> String {
        format!(
            "{}={}&{}={}",
            URLS_TESTED_ARG, self.urls_tested, REMAINING_ERRORS_ARG, self.remaining_errors
        )
    }
}

impl From<&RecheckOutcome> for RedirectParams {
    fn from(outcome: &RecheckOutcome) -> Self {
        Self::new(outcome.tested, outcome.has_remaining_errors)
    }
}

impl From<&BatchOutcome> for RedirectParams {
    fn from(outcome: &BatchOutcome) -> Self {
        Self::new(outcome.tested, outcome.any_remaining_errors)
    }
}

pub struct RecheckCoordinator {
    store: Arc<ValidationStore>,
    validator: Arc<dyn Validator>,
}

impl RecheckCoordinator {
    pub fn new(store: Arc<ValidationStore>, validator: Arc<dyn Validator>) -> Self {
        Self { store, validator }
    }

    /// Validate `url` and replace its snapshot.
    ///
    /// On validator failure nothing is written. A storage failure is returned
    /// as-is; records created before it stay in the registry.
    pub async fn recheck_one(&self, url: &str) -> Result<RecheckOutcome, RecheckError> {
        let errors = self.validator.validate(url).await?;
        let result = self.store.store(&errors, url).await?;

        info!(url, errors = errors.len(), "url rechecked");
        Ok(RecheckOutcome {
            tested: 1,
            has_remaining_errors: !errors.is_empty(),
            result,
        })
    }

    /// Recheck `urls` one after another. A failing URL is logged and skipped.
    pub async fn recheck_many(&self, urls: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for url in urls {
            match self.recheck_one(url).await {
                Ok(single) => {
                    outcome.tested += single.tested;
                    outcome.any_remaining_errors |= single.has_remaining_errors;
                }
                Err(e) => {
                    warn!(url = %url, "Recheck failed, stored result left untouched: {}", e);
                    outcome.failed.push(url.clone());
                }
            }
        }

        info!(
            requested = urls.len(),
            tested = outcome.tested,
            failed = outcome.failed.len(),
            remaining_errors = outcome.any_remaining_errors,
            "batch recheck complete"
        );
        outcome
    }

    /// Recheck stored snapshots by id. Unknown ids are skipped and not tested.
    pub async fn recheck_stored(&self, url_hashes: &[UrlHash]) -> BatchOutcome {
        let mut urls = Vec::with_capacity(url_hashes.len());
        for hash in url_hashes {
            match self.store.results().get(hash).await {
                Ok(Some(result)) if !result.url.is_empty() => urls.push(result.url),
                Ok(_) => warn!(url_hash = %hash, "No stored url for reference, skipping"),
                Err(e) => warn!(url_hash = %hash, "Failed to load stored url: {}", e),
            }
        }
        self.recheck_many(&urls).await
    }

    /// Recheck every stored snapshot. Fails without rechecking anything if
    /// the stored URLs cannot be listed.
    pub async fn recheck_all(&self) -> Result<BatchOutcome, StoreError> {
        let urls: Vec<String> = self
            .store
            .results()
            .list(usize::MAX)
            .await?
            .into_iter()
            .map(|result| result.url)
            .filter(|url| !url.is_empty())
            .collect();
        Ok(self.recheck_many(&urls).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_params_single() {
        let outcome = RecheckOutcome {
            tested: 1,
            has_remaining_errors: false,
            result: None,
        };
        let params = RedirectParams::from(&outcome);
        assert_eq!(params.urls_tested, "1");
        assert_eq!(params.remaining_errors, "0");
    }

    #[test]
    fn test_redirect_params_batch_query() {
        let outcome = BatchOutcome {
            tested: 3,
            any_remaining_errors: true,
            failed: vec![],
        };
        assert_eq!(
            RedirectParams::from(&outcome).to_query(),
            "amp_urls_tested=3&amp_remaining_errors=1"
        );
    }
}
