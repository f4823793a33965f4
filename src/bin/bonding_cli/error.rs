//! Error types for the bonding curve CLI.

use bonding_sdk::error::SdkError;

use crate::config::ConfigError;

/// Main error type for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    #[error("No signing account configured, set PRIVATE_KEY")]
    NoAccount,

    #[error("Event stream closed unexpectedly")]
    StreamClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
