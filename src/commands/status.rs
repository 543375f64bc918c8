use anyhow::{bail, Result};
use serde_json::json;
use validation_store::canonical::CanonicalKey;
use validation_store::error::StoreError;
use validation_store::state::AppState;
use validation_store::status::ErrorStatus;

/// Set the status of one deduplicated error.
pub async fn set_status(state: &AppState, key: &str, status: ErrorStatus) -> Result<()> {
    let Some(key) = CanonicalKey::parse(key) else {
        bail!("`{}` is not a canonical key (64 lowercase hex chars)", key);
    };

    match state.store.set_status(&key, status).await {
        Ok(record) => {
            println!("`{}` is now {}", record.key.short(), record.status);
            Ok(())
        }
        Err(StoreError::NotFound(_)) => bail!("No validation error with key `{}`", key),
        Err(e) => Err(e.into()),
    }
}

/// List deduplicated errors in `status`.
pub async fn records(state: &AppState, status: ErrorStatus, as_json: bool) -> Result<()> {
    let records = state.store.registry().query_by_status(status).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No {} validation errors.", status);
        return Ok(());
    }

    println!("{} {} validation error(s)\n", records.len(), status);
    for record in &records {
        let created = chrono::DateTime::from_timestamp(record.created_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("  `{}` {}  ({})", record.key, json!(record.descriptor), created);
    }
    Ok(())
}
