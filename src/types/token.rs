use std::fmt;

use alloy::primitives::{Address, U256};

use crate::abi::factory::TokenFactory;

/// Bonding-curve parameters of a token created by the factory.
///
/// Read-only projection of the on-chain configuration, which is immutable
/// once the token is created. Numeric fields keep the full 256-bit width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenConfig {
    pub token_address: Address,
    pub reserve_token: Address,
    pub slope: U256,
    pub reserve_weight: U256,
}

impl From<TokenFactory::TokenConfig> for TokenConfig {
    fn from(value: TokenFactory::TokenConfig) -> Self {
        Self {
            token_address: value.tokenAddress,
            reserve_token: value.reserveToken,
            slope: value.slope,
            reserve_weight: value.reserveWeight,
        }
    }
}

impl From<TokenFactory::tokenConfigsReturn> for TokenConfig {
    fn from(value: TokenFactory::tokenConfigsReturn) -> Self {
        Self {
            token_address: value.tokenAddress,
            reserve_token: value.reserveToken,
            slope: value.slope,
            reserve_weight: value.reserveWeight,
        }
    }
}

impl fmt::Display for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "token: {}, reserve: {}, slope: {}, reserve weight: {}",
            self.token_address, self.reserve_token, self.slope, self.reserve_weight
        )
    }
}

/// Parameters of a new bonding-curve token.
///
/// Amounts are integers in base units, e.g. 18-decimal fixed point for
/// the initial supply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewToken {
    pub name: String,
    pub symbol: String,
    pub initial_supply: U256,
    pub reserve_weight: U256,
    pub slope: U256,
    pub creator: Address,
    pub reserve_token: Address,
    pub exchange: Address,
}

impl NewToken {
    pub(crate) fn into_call(self) -> TokenFactory::createTokenCall {
        TokenFactory::createTokenCall {
            name: self.name,
            symbol: self.symbol,
            initialSupply: self.initial_supply,
            reserveWeight: self.reserve_weight,
            slope: self.slope,
            creator: self.creator,
            reserveTokenAddress: self.reserve_token,
            _exchangeAddress: self.exchange,
        }
    }
}
