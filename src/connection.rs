//! Connection factory.
//!
//! Builds read-only connections and signing sessions to the remote ledger.
//! A [`SigningAgent`] plays the part of an interactive wallet: when it is
//! present both roles route through its endpoint and signing sessions sign
//! with its keys, otherwise signing is unavailable and read-only connections
//! use the chain's public endpoint.

use std::{fmt, future::Future};

use alloy::{
    network::{Ethereum, EthereumWallet, NetworkWallet},
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use tracing::{debug, info};
use url::Url;

use crate::{
    Chain,
    error::{ConnectionError, SdkError},
};

/// Role of the connection to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    ReadOnly,
    Signing,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::ReadOnly => f.write_str("read-only"),
            Role::Signing => f.write_str("signing"),
        }
    }
}

/// Signing-capable connection, bound to the account transactions are sent from.
#[derive(Clone, Debug)]
pub struct Signer {
    provider: DynProvider,
    account: Option<Address>,
}

impl Signer {
    pub fn new(provider: DynProvider, account: Option<Address>) -> Self {
        Self { provider, account }
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Account the transactions are sent from, if known.
    /// Without it the connection picks its default signer.
    pub fn account(&self) -> Option<Address> {
        self.account
    }
}

/// Source of connections consumed by [`crate::session::SessionManager`].
pub trait Connector: Send + Sync + 'static {
    /// Builds a connection for the given role.
    ///
    /// Returns `Ok(None)` when the role is not available in the current
    /// environment, which is not an error.
    fn connect(
        &self,
        role: Role,
    ) -> impl Future<Output = Result<Option<DynProvider>, ConnectionError>> + Send;

    /// Accounts the signing agent can sign for.
    /// Connectors without account enumeration return no accounts.
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, ConnectionError>> + Send {
        async { Ok(Vec::new()) }
    }

    /// Builds a signing connection scoped to the given account.
    fn connect_as(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<DynProvider, ConnectionError>> + Send;
}

/// Wallet of local signing keys along with the endpoint it submits through.
#[derive(Clone, derive_more::Debug)]
pub struct SigningAgent {
    #[debug(skip)]
    wallet: EthereumWallet,
    accounts: Vec<Address>,
    endpoint: Url,
}

impl SigningAgent {
    pub fn new(wallet: EthereumWallet, endpoint: Url) -> Self {
        // Default signer first, the rest in no particular order
        let default = NetworkWallet::<Ethereum>::default_signer_address(&wallet);
        let accounts = std::iter::once(default)
            .chain(NetworkWallet::<Ethereum>::signer_addresses(&wallet).filter(|a| *a != default))
            .collect();
        Self {
            wallet,
            accounts,
            endpoint,
        }
    }

    /// Creates an agent from hex-encoded private keys, the first key being the default signer.
    pub fn from_keys<S: AsRef<str>>(keys: &[S], endpoint: Url) -> Result<Self, SdkError> {
        let mut signers = keys.iter().map(|key| {
            key.as_ref()
                .trim()
                .parse::<PrivateKeySigner>()
                .map_err(|e| SdkError::InvalidKey(e.to_string()))
        });
        let default = signers
            .next()
            .ok_or_else(|| SdkError::InvalidKey("no signing key provided".to_string()))??;
        let mut wallet = EthereumWallet::new(default);
        for signer in signers {
            wallet.register_signer(signer?);
        }
        Ok(Self::new(wallet, endpoint))
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Builds connections over HTTP for a specific chain.
#[derive(Clone, Debug)]
pub struct ConnectionFactory {
    chain: Chain,
    endpoint: Url,
    agent: Option<SigningAgent>,
    multicall: bool,
}

impl ConnectionFactory {
    /// Creates a factory using the chain's public endpoint, without a signing agent
    /// and with multicall batching of read calls enabled.
    pub fn new(chain: &Chain) -> Result<Self, SdkError> {
        Ok(Self {
            chain: chain.clone(),
            endpoint: Url::parse(chain.rpc_url())?,
            agent: None,
            multicall: true,
        })
    }

    /// Sets the remote endpoint used for read-only access without a signing agent.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the signing agent, if one is available.
    pub fn with_agent(mut self, agent: Option<SigningAgent>) -> Self {
        self.agent = agent;
        self
    }

    /// Enables or disables aggregation of read calls into multicalls (default: enabled).
    pub fn with_multicall(mut self, enabled: bool) -> Self {
        self.multicall = enabled;
        self
    }

    /// Whether a signing agent is available.
    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    fn agent(&self) -> Result<&SigningAgent, ConnectionError> {
        self.agent.as_ref().ok_or(ConnectionError::AgentUnavailable)
    }

    fn signing_provider(agent: &SigningAgent) -> DynProvider {
        ProviderBuilder::new()
            .wallet(agent.wallet.clone())
            .connect_http(agent.endpoint.clone())
            .erased()
    }

    async fn verified(&self, provider: DynProvider) -> Result<DynProvider, ConnectionError> {
        let actual = provider
            .get_chain_id()
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        if actual != self.chain.chain_id() {
            return Err(ConnectionError::ChainMismatch {
                expected: self.chain.chain_id(),
                actual,
            });
        }
        Ok(provider)
    }
}

impl Connector for ConnectionFactory {
    async fn connect(&self, role: Role) -> Result<Option<DynProvider>, ConnectionError> {
        let provider = match (role, &self.agent) {
            (Role::ReadOnly, agent) => {
                let url = agent
                    .as_ref()
                    .map_or(&self.endpoint, |a| a.endpoint())
                    .clone();
                debug!(%url, multicall = self.multicall, via_agent = agent.is_some(), "Building read-only connection");
                if self.multicall {
                    ProviderBuilder::new()
                        .with_call_batching()
                        .connect_http(url)
                        .erased()
                } else {
                    ProviderBuilder::new().connect_http(url).erased()
                }
            }
            (Role::Signing, Some(agent)) => {
                debug!(url = %agent.endpoint(), "Building signing connection");
                Self::signing_provider(agent)
            }
            (Role::Signing, None) => {
                info!("No signing agent available, signing session disabled");
                return Ok(None);
            }
        };
        self.verified(provider).await.map(Some)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ConnectionError> {
        Ok(self
            .agent
            .as_ref()
            .map(|a| a.accounts.clone())
            .unwrap_or_default())
    }

    async fn connect_as(&self, account: Address) -> Result<DynProvider, ConnectionError> {
        let agent = self.agent()?;
        if !agent.accounts.contains(&account) {
            return Err(ConnectionError::UnknownAccount(account));
        }
        debug!(%account, "Building account-scoped signing connection");
        self.verified(Self::signing_provider(agent)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development keys, never used on a live network.
    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_agent_from_keys() {
        let endpoint = Url::parse("http://localhost:8545").unwrap();
        let agent = SigningAgent::from_keys(&[KEY_0, KEY_1], endpoint).unwrap();
        assert_eq!(agent.accounts().len(), 2);
        assert_eq!(
            agent.accounts()[0],
            alloy::primitives::address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert!(agent.accounts().contains(&alloy::primitives::address!(
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        )));
    }

    #[test]
    fn test_agent_rejects_bad_keys() {
        let endpoint = Url::parse("http://localhost:8545").unwrap();
        assert!(matches!(
            SigningAgent::from_keys::<&str>(&[], endpoint.clone()),
            Err(SdkError::InvalidKey(_))
        ));
        assert!(matches!(
            SigningAgent::from_keys(&["0x1234"], endpoint),
            Err(SdkError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_factory_without_agent() {
        let factory = ConnectionFactory::new(&Chain::sepolia()).unwrap();
        assert!(!factory.has_agent());
        assert_eq!(factory.connect(Role::Signing).await.unwrap().map(|_| ()), None);
        assert!(factory.request_accounts().await.unwrap().is_empty());
        assert_eq!(
            factory
                .connect_as(Address::ZERO)
                .await
                .map(|_| ())
                .unwrap_err(),
            ConnectionError::AgentUnavailable
        );
    }

    #[tokio::test]
    async fn test_factory_unknown_account() {
        let endpoint = Url::parse("http://localhost:8545").unwrap();
        let agent = SigningAgent::from_keys(&[KEY_0], endpoint).unwrap();
        let factory = ConnectionFactory::new(&Chain::sepolia())
            .unwrap()
            .with_agent(Some(agent));
        assert!(factory.has_agent());
        assert_eq!(
            factory.request_accounts().await.unwrap(),
            vec![alloy::primitives::address!(
                "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            )]
        );
        assert_eq!(
            factory
                .connect_as(Address::ZERO)
                .await
                .map(|_| ())
                .unwrap_err(),
            ConnectionError::UnknownAccount(Address::ZERO)
        );
    }
}
