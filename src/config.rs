use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::Level;

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub validator_url: String,
    pub validator_timeout: Duration,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/validation"),
            validator_url: "http://localhost:8080/validate".to_string(),
            validator_timeout: Duration::from_secs(30),
            log_level: Level::INFO,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_dir = dotenv::var("VALIDATION_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let validator_url =
            dotenv::var("VALIDATOR_URL").unwrap_or(defaults.validator_url);
        let validator_timeout = match dotenv::var("VALIDATOR_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.trim()
                    .parse::<u64>()
                    .context("VALIDATOR_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            Err(_) => defaults.validator_timeout,
        };
        let log_level = match dotenv::var("LOG_LEVEL") {
            Ok(level) => level
                .trim()
                .parse::<Level>()
                .map_err(|e| anyhow::anyhow!("Invalid LOG_LEVEL `{}`: {}", level, e))?,
            Err(_) => defaults.log_level,
        };

        Ok(Self {
            data_dir,
            validator_url,
            validator_timeout,
            log_level,
        })
    }
}
