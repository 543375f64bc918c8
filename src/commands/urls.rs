use anyhow::Result;
use validation_store::state::AppState;
use validation_store::status::ErrorStatus;

/// List stored URL snapshots, most recently checked first.
pub async fn urls(state: &AppState, limit: usize) -> Result<()> {
    let results = state.store.results().list(limit).await?;

    if results.is_empty() {
        println!("No URLs with validation errors stored.");
        return Ok(());
    }

    for result in &results {
        let counts = state.summary.status_counts(&result.url_hash()).await?;
        let checked = chrono::DateTime::from_timestamp(result.checked_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {} - {} error(s), new {} / ack {} / ignored {}  (checked {})",
            result.url,
            result.entries.len(),
            counts.new,
            counts.acknowledged,
            counts.ignored,
            checked
        );
    }
    Ok(())
}

/// Store-wide counts: records per status and URLs per status.
pub async fn overview(state: &AppState) -> Result<()> {
    let records = state.store.registry().count_by_status().await?;
    let urls = state.summary.urls_with_status().await?;

    println!("Validation errors: {}", records.total());
    for status in ErrorStatus::ALL {
        println!(
            "  {:<13} {:>5} error(s) on {:>5} URL(s)",
            status.to_string(),
            records.get(status),
            urls.get(status)
        );
    }
    if urls.new > 0 {
        println!("\n{} URL(s) w/ new validation errors", urls.new);
    }
    Ok(())
}
