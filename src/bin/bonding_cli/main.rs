//! Command line client for the bonding curve exchange.
//!
//! Network, endpoint and signing keys come from the environment, the command
//! to run from the arguments. Without `PRIVATE_KEY` only read commands work.

mod command;
mod config;
mod error;

use std::process::exit;

use clap::Parser;
use tracing::error;

use command::App;
use config::{CliConfig, EnvConfig};

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    // Parse environment configuration
    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    // Parse CLI arguments
    let cli_config = CliConfig::parse();

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = match App::try_new(&env_config).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to start: {}", e);
            exit(1);
        }
    };

    if let Err(e) = app.run(cli_config.command).await {
        error!(%e, "Command failed");
        exit(1);
    }
}
