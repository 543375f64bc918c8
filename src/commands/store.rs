use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use validation_store::state::AppState;
use validation_store::validator::parse_validator_output;

/// Store a validator's output for `url`, read from `file` or stdin.
pub async fn store(state: &AppState, url: &str, file: Option<&Path>) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let json = serde_json::from_str(&raw).context("Errors must be JSON")?;
    let errors = parse_validator_output(json)?;
    info!(url, errors = errors.len(), "Storing validation errors");

    match state.store.store(&errors, url).await? {
        Some(hash) => println!("Stored {} error(s) for {}\nRecord: `{}`", errors.len(), url, hash),
        None => println!("No validation errors for {}; any stored result was removed.", url),
    }
    Ok(())
}
