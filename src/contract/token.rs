use std::sync::Arc;

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use tracing::debug;

use super::{Binding, Bound};
use crate::{
    abi::erc20::IERC20,
    connection::{ConnectionFactory, Connector},
    error::SdkError,
    session::SessionManager,
    types::{Operation, TxId, checksum},
};

/// Generic fungible token facade, used for the reserve asset and for created tokens.
#[derive(Debug)]
pub struct Erc20Token<C: Connector = ConnectionFactory> {
    contract: Bound<C>,
}

impl<C: Connector> Erc20Token<C> {
    pub fn new(manager: Arc<SessionManager<C>>, address: Address) -> Self {
        Self {
            contract: Bound::new("ERC20", address, manager),
        }
    }

    /// Facade over the chain's reserve asset.
    pub fn reserve(manager: Arc<SessionManager<C>>) -> Self {
        let address = manager.chain().reserve_token();
        Self::new(manager, address)
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

    pub async fn balance_of(&self, owner: Address) -> Result<U256, SdkError> {
        balance_of(self.contract.binding()?, self.address(), owner).await
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, SdkError> {
        allowance(self.contract.binding()?, self.address(), owner, spender).await
    }

    pub async fn approve(&self, spender: Address, amount: U256) -> Result<TxId, SdkError> {
        approve(self.contract.binding()?, self.address(), spender, amount).await
    }

    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TxId, SdkError> {
        let binding = self.contract.binding()?;
        let calldata = IERC20::transferCall { to, amount }.abi_encode();
        binding
            .submit(Operation::Transfer, to, Some(amount), self.address(), calldata)
            .await
    }

    pub async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxId, SdkError> {
        let binding = self.contract.binding()?;
        let calldata = IERC20::transferFromCall { from, to, amount }.abi_encode();
        binding
            .submit(Operation::TransferFrom, from, Some(amount), self.address(), calldata)
            .await
    }

    pub async fn symbol(&self) -> Result<String, SdkError> {
        symbol(self.contract.binding()?, self.address()).await
    }

    pub async fn name(&self) -> Result<String, SdkError> {
        let binding = self.contract.binding()?;
        let token = IERC20::new(self.address(), binding.reader());
        binding
            .read(Operation::Name, self.address(), token.name().call())
            .await
    }

    pub async fn decimals(&self) -> Result<u8, SdkError> {
        let binding = self.contract.binding()?;
        let token = IERC20::new(self.address(), binding.reader());
        binding
            .read(Operation::Decimals, self.address(), token.decimals().call())
            .await
    }

    pub async fn total_supply(&self) -> Result<U256, SdkError> {
        let binding = self.contract.binding()?;
        let token = IERC20::new(self.address(), binding.reader());
        binding
            .read(Operation::TotalSupply, self.address(), token.totalSupply().call())
            .await
    }
}

pub(super) async fn balance_of(
    binding: &Binding,
    token: Address,
    owner: Address,
) -> Result<U256, SdkError> {
    let erc20 = IERC20::new(token, binding.reader());
    binding
        .read(Operation::BalanceOf, token, erc20.balanceOf(owner).call())
        .await
}

pub(super) async fn allowance(
    binding: &Binding,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, SdkError> {
    debug!(
        token = checksum(&token),
        owner = checksum(&owner),
        spender = checksum(&spender),
        "Querying allowance"
    );
    let erc20 = IERC20::new(token, binding.reader());
    binding
        .read(Operation::Allowance, token, erc20.allowance(owner, spender).call())
        .await
}

pub(super) async fn approve(
    binding: &Binding,
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<TxId, SdkError> {
    let calldata = IERC20::approveCall { spender, amount }.abi_encode();
    binding
        .submit(Operation::Approve, token, Some(amount), token, calldata)
        .await
}

pub(super) async fn symbol(binding: &Binding, token: Address) -> Result<String, SdkError> {
    let erc20 = IERC20::new(token, binding.reader());
    binding
        .read(Operation::Symbol, token, erc20.symbol().call())
        .await
}
