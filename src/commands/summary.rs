use anyhow::Result;
use serde_json::json;
use validation_store::state::AppState;
use validation_store::store::types::UrlHash;

/// Print status counts and the grouped breakdown for `url`.
pub async fn summary(state: &AppState, url: &str, as_json: bool) -> Result<()> {
    let hash = UrlHash::of(url);
    let counts = state.summary.status_counts(&hash).await?;
    let grouped = state.summary.grouped_summary(&hash).await?;

    if as_json {
        let out = json!({ "url": url, "counts": counts, "summary": grouped });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{}\n  New: {}  Acknowledged: {}  Ignored: {}",
        url, counts.new, counts.acknowledged, counts.ignored
    );
    print_counts("Removed elements", grouped.removed_elements.iter());
    print_counts("Removed attributes", grouped.removed_attributes.iter());
    for (kind, names) in &grouped.sources_with_invalid_output {
        print_counts(&format!("Invalid output from {}", kind), names.iter());
    }
    Ok(())
}

fn print_counts<'a>(title: &str, items: impl Iterator<Item = (&'a String, &'a usize)>) {
    let items: Vec<String> = items
        .map(|(name, count)| {
            if *count == 1 {
                format!("`{}`", name)
            } else {
                format!("`{}` ({})", name, count)
            }
        })
        .collect();
    if items.is_empty() {
        println!("  {}: --", title);
    } else {
        println!("  {}: {}", title, items.join(", "));
    }
}
