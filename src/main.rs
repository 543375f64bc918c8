mod cli;
mod commands;

use clap::Parser;
use tracing::info;

use cli::Cli;
use validation_store::config::Config;
use validation_store::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(url) = cli.validator_url.clone() {
        config.validator_url = url;
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let state = AppState::init(config).await?;
    info!(
        data_dir = ?state.config.data_dir,
        validator = %state.config.validator_url,
        "validation store opened"
    );

    commands::run(&state, cli.command).await
}
