use anyhow::Result;
use serde_json::json;
use validation_store::state::AppState;
use validation_store::store::types::{ResolveOptions, UrlHash};

/// Print the errors stored for `url`.
pub async fn errors(state: &AppState, url: &str, ignore_ignored: bool, as_json: bool) -> Result<()> {
    let options = ResolveOptions {
        exclude_ignored: ignore_ignored,
    };
    let resolved = state.store.resolve_errors(&UrlHash::of(url), options).await?;

    if as_json {
        let out: Vec<_> = resolved
            .iter()
            .map(|error| {
                json!({
                    "key": error.record.key,
                    "status": error.status(),
                    "descriptor": error.descriptor(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if resolved.is_empty() {
        println!("No validation errors stored for {}", url);
        return Ok(());
    }

    println!("Validation errors for {}\n", url);
    for error in &resolved {
        let descriptor = &error.record.descriptor;
        println!(
            "  [{}] `{}` {} <{}>",
            error.status(),
            error.record.key.short(),
            descriptor.code().unwrap_or("?"),
            descriptor.node_name().unwrap_or("?"),
        );
        for source in error.source_list() {
            println!("      source: {}", source);
        }
    }
    Ok(())
}
