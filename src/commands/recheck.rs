use anyhow::Result;
use validation_store::recheck::RedirectParams;
use validation_store::state::AppState;

/// Recheck one URL, several, or every stored one.
pub async fn recheck(state: &AppState, urls: &[String], all: bool) -> Result<()> {
    let params = if all {
        let outcome = state.recheck.recheck_all().await?;
        report_failures(&outcome.failed);
        RedirectParams::from(&outcome)
    } else if let [url] = urls {
        let outcome = state.recheck.recheck_one(url).await?;
        RedirectParams::from(&outcome)
    } else {
        let outcome = state.recheck.recheck_many(urls).await;
        report_failures(&outcome.failed);
        RedirectParams::from(&outcome)
    };

    println!("{}", notice(&params));
    println!("{}", params.to_query());
    Ok(())
}

fn report_failures(failed: &[String]) {
    for url in failed {
        eprintln!("Not updated: {}", url);
    }
}

/// Admin notice shown after a recheck.
fn notice(params: &RedirectParams) -> &'static str {
    let plural = params.urls_tested != "1";
    match (params.remaining_errors == "1", plural) {
        (true, false) => "The rechecked URL still has validation errors.",
        (true, true) => "The rechecked URLs still have validation errors.",
        (false, false) => "The rechecked URL has no validation errors.",
        (false, true) => "The rechecked URLs have no validation errors.",
    }
}
