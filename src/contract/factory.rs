use std::sync::Arc;

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use tracing::{debug, info};

use super::Bound;
use crate::{
    abi::factory::TokenFactory as Factory,
    connection::{ConnectionFactory, Connector},
    error::SdkError,
    session::SessionManager,
    types::{NewToken, Operation, TokenConfig, TxId},
};

/// Token factory facade: token creation, configuration lookups and ownership.
#[derive(Debug)]
pub struct TokenFactory<C: Connector = ConnectionFactory> {
    contract: Bound<C>,
}

impl<C: Connector> TokenFactory<C> {
    /// Factory registered for the manager's chain.
    pub fn new(manager: Arc<SessionManager<C>>) -> Self {
        let address = manager.chain().factory();
        Self::at(manager, address)
    }

    pub fn at(manager: Arc<SessionManager<C>>, address: Address) -> Self {
        Self {
            contract: Bound::new("TokenFactory", address, manager),
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn is_ready(&self) -> bool {
        self.contract.is_ready()
    }

    pub async fn initialize(&self) -> Result<(), SdkError> {
        self.contract.initialize().await
    }

    /// Parameters for a token traded on the chain's registered exchange and
    /// backed by its reserve asset, created by the signing account.
    pub fn new_token(
        &self,
        name: impl Into<String>,
        symbol: impl Into<String>,
        initial_supply: U256,
        reserve_weight: U256,
        slope: U256,
    ) -> Result<NewToken, SdkError> {
        let chain = self.contract.manager().chain();
        let creator = self
            .contract
            .binding()?
            .account(Operation::CreateToken)?;
        Ok(NewToken {
            name: name.into(),
            symbol: symbol.into(),
            initial_supply,
            reserve_weight,
            slope,
            creator,
            reserve_token: chain.reserve_token(),
            exchange: chain.exchange(),
        })
    }

    /// Submits token creation.
    pub async fn create_token(&self, params: NewToken) -> Result<TxId, SdkError> {
        let binding = self.contract.binding()?;
        info!(name = %params.name, symbol = %params.symbol, supply = %params.initial_supply, "Creating token");
        let amount = params.initial_supply;
        let calldata = params.into_call().abi_encode();
        binding
            .submit(
                Operation::CreateToken,
                self.address(),
                Some(amount),
                self.address(),
                calldata,
            )
            .await
    }

    /// Submits token creation and waits for the receipt, returning the new token address
    /// decoded from the `TokenCreated` event.
    pub async fn create_token_and_wait(&self, params: NewToken) -> Result<(TxId, Address), SdkError> {
        let amount = params.initial_supply;
        let tx = self.create_token(params).await?;
        let receipt = self
            .contract
            .binding()?
            .confirm(Operation::CreateToken, self.address(), Some(amount), tx)
            .await?;
        let created = receipt
            .decoded_log::<Factory::TokenCreated>()
            .ok_or_else(|| SdkError::Decode {
                operation: Operation::CreateToken,
                target: self.address(),
                reason: format!("no TokenCreated event in receipt of {tx}"),
            })?;
        info!(%tx, token = %created.data.tokenAddress, creator = %created.data.creator, "Token created");
        Ok((tx, created.data.tokenAddress))
    }

    /// Bonding-curve configuration of a token created by this factory.
    pub async fn get_token_config(&self, token: Address) -> Result<TokenConfig, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        let response = binding
            .read(Operation::TokenConfig, token, factory.getTokenConfig(token).call())
            .await?;
        debug!(%token, trailing = %response._1, "Token config decoded");
        Ok(response._0.into())
    }

    /// Configuration as stored in the factory's public mapping.
    pub async fn token_configs(&self, token: Address) -> Result<TokenConfig, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(Operation::TokenConfigs, token, factory.tokenConfigs(token).call())
            .await
            .map(TokenConfig::from)
    }

    pub async fn list_all_tokens(&self) -> Result<Vec<Address>, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(Operation::ListTokens, self.address(), factory.listAllTokens().call())
            .await
    }

    pub async fn tokens_created_by(&self, creator: Address) -> Result<Vec<Address>, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(
                Operation::TokensCreatedBy,
                creator,
                factory.tokensCreatedBy(creator).call(),
            )
            .await
    }

    pub async fn is_token_from_factory(&self, token: Address) -> Result<bool, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(
                Operation::IsTokenFromFactory,
                token,
                factory.isTokenFromFactory(token).call(),
            )
            .await
    }

    pub async fn total_created_tokens(&self) -> Result<U256, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(
                Operation::TotalCreatedTokens,
                self.address(),
                factory.totalCreatedTokens().call(),
            )
            .await
    }

    /// Tokens at creation indices `from..to`.
    pub async fn tokens_batch(&self, from: U256, to: U256) -> Result<Vec<Address>, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(
                Operation::TokensBatch,
                self.address(),
                factory.getTokensBatch(from, to).call(),
            )
            .await
    }

    pub async fn default_reserve_token(&self) -> Result<Address, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(
                Operation::DefaultReserveToken,
                self.address(),
                factory.defaultReserveToken().call(),
            )
            .await
    }

    pub async fn exchange_address(&self) -> Result<Address, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(
                Operation::ExchangeAddress,
                self.address(),
                factory.exchangeAddress().call(),
            )
            .await
    }

    pub async fn owner(&self) -> Result<Address, SdkError> {
        let binding = self.contract.binding()?;
        let factory = Factory::new(self.address(), binding.reader());
        binding
            .read(Operation::Owner, self.address(), factory.owner().call())
            .await
    }

    /// Initializes a freshly deployed factory with its default reserve asset.
    pub async fn initialize_factory(&self, default_reserve_token: Address) -> Result<TxId, SdkError> {
        let calldata = Factory::initializeCall {
            _defaultReserveToken: default_reserve_token,
        }
        .abi_encode();
        self.contract
            .binding()?
            .submit(
                Operation::InitializeFactory,
                default_reserve_token,
                None,
                self.address(),
                calldata,
            )
            .await
    }

    pub async fn transfer_ownership(&self, new_owner: Address) -> Result<TxId, SdkError> {
        let calldata = Factory::transferOwnershipCall {
            newOwner: new_owner,
        }
        .abi_encode();
        self.contract
            .binding()?
            .submit(
                Operation::TransferOwnership,
                new_owner,
                None,
                self.address(),
                calldata,
            )
            .await
    }

    pub async fn renounce_ownership(&self) -> Result<TxId, SdkError> {
        let calldata = Factory::renounceOwnershipCall {}.abi_encode();
        self.contract
            .binding()?
            .submit(
                Operation::RenounceOwnership,
                self.address(),
                None,
                self.address(),
                calldata,
            )
            .await
    }
}
