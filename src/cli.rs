use std::path::PathBuf;

use clap::{Parser, Subcommand};
use validation_store::ErrorStatus;

/// Track and recheck deduplicated validation errors per URL
#[derive(Parser)]
#[command(name = "validation-store", version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Store directory (overrides $VALIDATION_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Validator endpoint (overrides $VALIDATOR_URL)
    #[arg(long, global = true)]
    pub validator_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store validator output (JSON array of errors) for a URL
    Store {
        url: String,
        /// Read errors from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Re-validate URLs and update their stored results
    Recheck {
        /// URLs to recheck
        #[arg(required_unless_present = "all")]
        urls: Vec<String>,
        /// Recheck every stored URL
        #[arg(long, conflicts_with = "urls")]
        all: bool,
    },

    /// List the errors currently stored for a URL
    Errors {
        url: String,
        /// Leave out errors whose status is `ignored`
        #[arg(long)]
        ignore_ignored: bool,
        #[arg(long)]
        json: bool,
    },

    /// Status counts and grouped breakdown for a URL
    Summary {
        url: String,
        #[arg(long)]
        json: bool,
    },

    /// Set the status of a deduplicated error
    Status {
        /// Canonical key (64 hex chars)
        key: String,
        /// new | acknowledged | ignored
        status: ErrorStatus,
    },

    /// List deduplicated errors by status
    Records {
        #[arg(long, default_value = "new")]
        status: ErrorStatus,
        #[arg(long)]
        json: bool,
    },

    /// List stored URLs, most recently checked first
    Urls {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Counts across the whole store
    Overview,
}
