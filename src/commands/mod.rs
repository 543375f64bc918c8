mod errors;
mod recheck;
mod status;
mod store;
mod summary;
mod urls;

use validation_store::state::AppState;

use crate::cli::Commands;

pub async fn run(state: &AppState, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Store { url, file } => store::store(state, &url, file.as_deref()).await,
        Commands::Recheck { urls, all } => recheck::recheck(state, &urls, all).await,
        Commands::Errors {
            url,
            ignore_ignored,
            json,
        } => errors::errors(state, &url, ignore_ignored, json).await,
        Commands::Summary { url, json } => summary::summary(state, &url, json).await,
        Commands::Status { key, status } => status::set_status(state, &key, status).await,
        Commands::Records { status, json } => status::records(state, status, json).await,
        Commands::Urls { limit } => urls::urls(state, limit).await,
        Commands::Overview => urls::overview(state).await,
    }
}
