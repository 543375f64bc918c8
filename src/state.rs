use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::recheck::RecheckCoordinator;
use crate::store::ValidationStore;
use crate::summary::SummaryAggregator;
use crate::validator::{HttpValidator, Validator};

pub struct AppState {
    pub config: Config,
    pub store: Arc<ValidationStore>,
    pub recheck: RecheckCoordinator,
    pub summary: SummaryAggregator,
}

impl AppState {
    /// Open the store under `config.data_dir` and talk to the HTTP validator.
    pub async fn init(config: Config) -> Result<Self> {
        let validator: Arc<dyn Validator> = Arc::new(HttpValidator::from_config(&config)?);
        Self::with_validator(config, validator).await
    }

    pub async fn with_validator(config: Config, validator: Arc<dyn Validator>) -> Result<Self> {
        let store = Arc::new(ValidationStore::open(&config.data_dir).await?);
        Ok(Self {
            recheck: RecheckCoordinator::new(store.clone(), validator),
            summary: SummaryAggregator::new(store.clone()),
            store,
            config,
        })
    }
}
