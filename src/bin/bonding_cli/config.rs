//! Configuration for the bonding curve CLI.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): network, endpoint, keys
//! - CLI arguments: the command to run and its parameters

use std::time::Duration;

use bonding_sdk::{
    Chain,
    connection::{ConnectionFactory, SigningAgent},
    error::SdkError,
    session::Settings,
};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use url::Url;

/// Environment configuration (connection details, credentials).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// Registered network name, `mainnet` or `sepolia`
    #[serde(default = "default_network")]
    pub network: String,

    /// Optional RPC URL overriding the network's public endpoint
    pub rpc_url: Option<String>,

    /// Optional comma-separated signing keys, the first one is the active account
    pub private_key: Option<String>,

    /// Confirmations to wait for approvals (default: 1)
    pub confirmations: Option<u64>,

    /// Optional timeout for single calls and receipt waits
    pub timeout_seconds: Option<u64>,

    /// Aggregate read calls into multicalls (default: true)
    pub multicall: Option<bool>,
}

fn default_network() -> String {
    "sepolia".to_string()
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Resolve the network, failing on unknown names.
    pub fn chain(&self) -> Result<Chain, SdkError> {
        Chain::by_name(&self.network)
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();
        if let Some(confirmations) = self.confirmations {
            settings.confirmations = confirmations;
        }
        match self.timeout_seconds {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => {
                settings.call_timeout = Some(Duration::from_secs(secs));
                settings.init_timeout = Some(Duration::from_secs(secs));
                settings.receipt_timeout = Duration::from_secs(secs);
            }
            None => {}
        }
        Ok(settings)
    }

    fn private_keys(&self) -> Vec<&str> {
        self.private_key
            .iter()
            .flat_map(|keys| keys.split(','))
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect_vec()
    }

    /// Connector for the chain, with a signing agent if keys are configured.
    pub fn connector(&self, chain: &Chain) -> Result<ConnectionFactory, ConfigError> {
        let endpoint = match &self.rpc_url {
            Some(url) => Url::parse(url)?,
            None => Url::parse(chain.rpc_url())?,
        };
        let keys = self.private_keys();
        let agent = if keys.is_empty() {
            None
        } else {
            Some(SigningAgent::from_keys(&keys, endpoint.clone()).map_err(ConfigError::Keys)?)
        };
        Ok(ConnectionFactory::new(chain)
            .map_err(ConfigError::Keys)?
            .with_endpoint(endpoint)
            .with_agent(agent)
            .with_multicall(self.multicall.unwrap_or(true)))
    }
}

/// CLI arguments.
#[derive(Debug, Parser)]
#[command(name = "bonding-cli")]
#[command(about = "Trade and create bonding curve tokens")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

/// Amounts are decimal values in the units of the asset spent, e.g. `"1.5"`.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Quote the output of a trade without submitting it
    Quote {
        token: String,
        amount: String,
        /// Quote a sale instead of a purchase
        #[arg(long)]
        sell: bool,
    },

    /// Buy tokens with the reserve asset, approving the exchange if needed
    Buy { token: String, amount: String },

    /// Sell tokens for the reserve asset, approving the exchange if needed
    Sell { token: String, amount: String },

    /// Show the allowance granted to the exchange
    Allowance {
        token: String,
        /// Owner of the tokens (default: active account)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Approve the exchange to spend the given amount
    Approve { token: String, amount: String },

    /// Create a new bonding curve token backed by the reserve asset
    CreateToken {
        name: String,
        symbol: String,
        /// Initial supply in whole tokens (18 decimals)
        #[arg(long)]
        supply: String,
        /// Curve reserve weight, integer
        #[arg(long)]
        reserve_weight: String,
        /// Curve slope, integer
        #[arg(long)]
        slope: String,
    },

    /// Show the curve configuration of a token
    TokenConfig { token: String },

    /// List tokens created by the factory
    Tokens {
        /// Only tokens created by this account
        #[arg(long)]
        creator: Option<String>,
    },

    /// Show a token balance (default token: reserve asset)
    Balance {
        token: Option<String>,
        /// Holder of the tokens (default: active account)
        #[arg(long)]
        account: Option<String>,
    },

    /// Follow trades executed by the exchange
    Watch {
        /// First block to follow (default: current head)
        #[arg(long)]
        from_block: Option<u64>,
    },
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),

    #[error("Invalid connection settings: {0}")]
    Keys(#[source] SdkError),

    #[error("TIMEOUT_SECONDS cannot be zero")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development keys, never used on a live network.
    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn env(network: &str) -> EnvConfig {
        EnvConfig {
            network: network.to_string(),
            rpc_url: None,
            private_key: None,
            confirmations: None,
            timeout_seconds: None,
            multicall: None,
        }
    }

    #[test]
    fn test_unknown_network() {
        assert!(matches!(
            env("rinkeby").chain(),
            Err(SdkError::UnsupportedNetwork(_))
        ));
        assert_eq!(env("Mainnet").chain().unwrap(), Chain::mainnet());
    }

    #[test]
    fn test_settings() {
        assert_eq!(env("sepolia").settings().unwrap(), Settings::default());

        let mut config = env("sepolia");
        config.confirmations = Some(0);
        config.timeout_seconds = Some(5);
        let settings = config.settings().unwrap();
        assert_eq!(settings.confirmations, 0);
        assert_eq!(settings.call_timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.receipt_timeout, Duration::from_secs(5));

        config.timeout_seconds = Some(0);
        assert!(matches!(config.settings(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_connector_keys() {
        let mut config = env("sepolia");
        let chain = config.chain().unwrap();
        assert!(!config.connector(&chain).unwrap().has_agent());

        config.private_key = Some(format!(" {KEY_0}, {KEY_1} ,"));
        assert_eq!(config.private_keys(), vec![KEY_0, KEY_1]);
        assert!(config.connector(&chain).unwrap().has_agent());

        config.private_key = Some("0x1234".to_string());
        assert!(matches!(
            config.connector(&chain),
            Err(ConfigError::Keys(SdkError::InvalidKey(_)))
        ));

        config.private_key = None;
        config.rpc_url = Some("not a url".to_string());
        assert!(matches!(
            config.connector(&chain),
            Err(ConfigError::InvalidRpcUrl(_))
        ));
    }
}
