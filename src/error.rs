use thiserror::Error;

use crate::status::ErrorStatus;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the error registry and the url result store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("validation error not found: {0}")]
    NotFound(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: ErrorStatus, to: ErrorStatus },

    #[error("storage read failed: {0:#}")]
    Storage(anyhow::Error),

    #[error("storage write failed: {0:#}")]
    StorageWrite(anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of the external validator for a single URL.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("validator request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("validator returned HTTP {0}")]
    Status(u16),

    #[error("validator returned malformed output: {0}")]
    Malformed(String),
}

/// Why a single URL was not updated during a recheck.
#[derive(Error, Debug)]
pub enum RecheckError {
    #[error(transparent)]
    Validator(#[from] ValidatorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
