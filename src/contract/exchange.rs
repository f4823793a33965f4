use std::sync::Arc;

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use tracing::info;

use super::{Bound, token};
use crate::{
    abi::{erc20::IReserveToken, exchange::TokenExchange as Exchange},
    connection::{ConnectionFactory, Connector},
    error::SdkError,
    session::SessionManager,
    types::{AllowanceOutcome, Operation, TradeOp, TradeReceipt, TxId},
};

/// Exchange facade: bonding-curve trades, quotes and the allowance workflow.
///
/// # Allowance race
///
/// [`TokenExchange::ensure_allowance`] reads the allowance and approves in a
/// separate transaction. An approval or transfer issued concurrently by
/// someone else for the same owner and spender may invalidate the check
/// before the trade lands. Callers needing strict guarantees must combine
/// approval and trade in a single on-chain transaction.
#[derive(Debug)]
pub struct TokenExchange<C: Connector = ConnectionFactory> {
    contract: Bound<C>,
    reserve_token: Address,
}

impl<C: Connector> TokenExchange<C> {
    /// Exchange registered for the manager's chain.
    pub fn new(manager: Arc<SessionManager<C>>) -> Self {
        let address = manager.chain().exchange();
        Self::at(manager, address)
    }

    /// Exchange deployed at a specific address.
    pub fn at(manager: Arc<SessionManager<C>>, address: Address) -> Self {
        let reserve_token = manager.chain().reserve_token();
        Self {
            contract: Bound::new("TokenExchange", address, manager),
            reserve_token,
        }
    }

    /// Overrides the reserve asset spent by buys, the chain's default otherwise.
    pub fn with_reserve_token(mut self, reserve_token: Address) -> Self {
        self.reserve_token = reserve_token;
        self
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn reserve_token(&self) -> Address {
        self.reserve_token
    }

    pub fn is_ready(&self) -> bool {
        self.contract.is_ready()
    }

    pub async fn initialize(&self) -> Result<(), SdkError> {
        self.contract.initialize().await
    }

    /// Buys curve tokens spending `reserve_amount` of the reserve asset.
    pub async fn buy(&self, token: Address, reserve_amount: U256) -> Result<TxId, SdkError> {
        self.execute(TradeOp::Buy, token, reserve_amount).await
    }

    /// Sells `token_amount` of curve tokens for the reserve asset.
    pub async fn sell(&self, token: Address, token_amount: U256) -> Result<TxId, SdkError> {
        self.execute(TradeOp::Sell, token, token_amount).await
    }

    /// Submits a trade in the given direction.
    pub async fn execute(&self, op: TradeOp, token: Address, amount: U256) -> Result<TxId, SdkError> {
        let binding = self.contract.binding()?;
        let calldata = match op {
            TradeOp::Buy => Exchange::buyTokenCall {
                token,
                reserveAmount: amount,
            }
            .abi_encode(),
            TradeOp::Sell => Exchange::sellTokenCall {
                token,
                tokenAmount: amount,
            }
            .abi_encode(),
        };
        binding
            .submit(op.operation(), token, Some(amount), self.address(), calldata)
            .await
    }

    /// Amount received for trading `amount` in the given direction, at the current curve state.
    pub async fn quote(&self, token: Address, amount: U256, op: TradeOp) -> Result<U256, SdkError> {
        let binding = self.contract.binding()?;
        let exchange = Exchange::new(self.address(), binding.reader());
        binding
            .read(
                Operation::Quote,
                token,
                exchange
                    .calculateExchangeAmount(token, amount, op.is_buying())
                    .call(),
            )
            .await
    }

    /// Factory the exchange trades tokens of.
    pub async fn token_factory(&self) -> Result<Address, SdkError> {
        let binding = self.contract.binding()?;
        let exchange = Exchange::new(self.address(), binding.reader());
        binding
            .read(Operation::TokenFactory, self.address(), exchange.tokenFactory().call())
            .await
    }

    /// Allowance granted by `owner` to `spender` over `token`, queried from the token contract.
    pub async fn check_allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
    ) -> Result<U256, SdkError> {
        token::allowance(self.contract.binding()?, token, owner, spender).await
    }

    /// Approves exactly `amount` of `token` for `spender` unless the current allowance covers it.
    ///
    /// The owner is the signing session's account. A submitted approval is awaited
    /// until mined and confirmed by the configured number of blocks.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<AllowanceOutcome, SdkError> {
        let binding = self.contract.binding()?;
        let owner = binding.account(Operation::Approve)?;
        let current = token::allowance(binding, token, owner, spender).await?;
        if current >= amount {
            info!(%token, %spender, %current, %amount, "Allowance sufficient");
            return Ok(AllowanceOutcome::Sufficient { current });
        }

        info!(%token, %spender, %current, %amount, "Allowance insufficient, approving");
        let tx = token::approve(binding, token, spender, amount).await?;
        binding
            .confirm(Operation::Approve, token, Some(amount), tx)
            .await?;
        Ok(AllowanceOutcome::Approved {
            previous: current,
            tx,
        })
    }

    /// Unconditionally approves `amount` of `token` for this exchange.
    pub async fn approve(&self, token: Address, amount: U256) -> Result<TxId, SdkError> {
        token::approve(self.contract.binding()?, token, self.address(), amount).await
    }

    pub async fn token_symbol(&self, token: Address) -> Result<String, SdkError> {
        token::symbol(self.contract.binding()?, token).await
    }

    pub async fn token_balance(&self, token: Address, account: Address) -> Result<U256, SdkError> {
        token::balance_of(self.contract.binding()?, token, account).await
    }

    /// Deposits backing collateral into the reserve asset.
    pub async fn deposit_reserve(&self, amount: U256) -> Result<TxId, SdkError> {
        let binding = self.contract.binding()?;
        let calldata = IReserveToken::depositReserveTokenCall { amount }.abi_encode();
        binding
            .submit(
                Operation::DepositReserve,
                self.reserve_token,
                Some(amount),
                self.reserve_token,
                calldata,
            )
            .await
    }

    /// Ensures the exchange may spend `reserve_amount` of the reserve asset, then buys.
    pub async fn buy_with_approval(
        &self,
        token: Address,
        reserve_amount: U256,
    ) -> Result<TradeReceipt, SdkError> {
        self.trade_with_approval(TradeOp::Buy, token, reserve_amount)
            .await
    }

    /// Ensures the exchange may spend `token_amount` of the curve token, then sells.
    pub async fn sell_with_approval(
        &self,
        token: Address,
        token_amount: U256,
    ) -> Result<TradeReceipt, SdkError> {
        self.trade_with_approval(TradeOp::Sell, token, token_amount)
            .await
    }

    async fn trade_with_approval(
        &self,
        op: TradeOp,
        token: Address,
        amount: U256,
    ) -> Result<TradeReceipt, SdkError> {
        let spent = match op {
            TradeOp::Buy => self.reserve_token,
            TradeOp::Sell => token,
        };
        let allowance = self.ensure_allowance(spent, self.address(), amount).await?;
        let trade = self.execute(op, token, amount).await?;
        Ok(TradeReceipt {
            approval: allowance.approval(),
            trade,
        })
    }
}
