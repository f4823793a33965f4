//! Bonding curve exchange SDK.
//!
//! # Overview
//!
//! Client-side facades over the token exchange and token factory contracts
//! of a bonding curve market, plus a generic fungible token facade used
//! for both the reserve asset and the created tokens.
//!
//! Create one [`session::SessionManager`] per process from a [`Chain`] and a
//! [`connection::ConnectionFactory`], share it via [`std::sync::Arc`] and pass
//! it to [`contract::TokenExchange`], [`contract::TokenFactory`] and
//! [`contract::Erc20Token`]. Every facade must be initialized with
//! `initialize()` before use, which awaits the single shared session
//! initialization.
//!
//! [`contract::TokenExchange::ensure_allowance`] and the `*_with_approval`
//! workflows check the allowance, approve the exact missing amount if needed
//! and then trade. The check and the approval are separate transactions, so
//! a concurrent external approval or transfer can invalidate the check.
//!
//! Use [`stream::trades`] to follow `TokenBought`/`TokenSold` events block by block.
//!
//! # Limitations/follow-ups
//!
//! * No live reconnection: once the session is ready it is kept for the
//!   process lifetime.
//!
//! * Failed transactions are never retried automatically.
//!
//! # Testing
//!
//! [`testing`] module provides an in-process JSON-RPC node with scripted
//! contract responses and a connector built on top of it.

pub mod abi;
pub mod connection;
pub mod contract;
pub mod error;
pub mod num;
pub mod session;
pub mod stream;
pub mod testing;
pub mod types;

use std::str::FromStr;

use alloy::primitives::{Address, address};

use crate::error::SdkError;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Network the contracts are deployed on, with their fixed addresses.
pub struct Chain {
    name: String,
    chain_id: u64,
    exchange: Address,
    factory: Address,
    reserve_token: Address,
    rpc_url: String,
}

impl Chain {
    /// Names accepted by [`Chain::by_name`].
    pub const NETWORKS: [&str; 2] = ["mainnet", "sepolia"];

    pub fn mainnet() -> Self {
        Self {
            name: "mainnet".to_string(),
            chain_id: 1,
            exchange: address!("0x6dBa9e1d90afa4A97E2a819Bcc1Ad22dEaF81794"),
            factory: address!("0x927294e922c3f8FbdC34Bd8b1875aE3D3e1637dF"),
            reserve_token: address!("0x54ceABC39627d9cEB578BB5fC4CE3DB972b2ce69"),
            rpc_url: "https://endpoints.omniatech.io/v1/eth/mainnet/public".to_string(),
        }
    }

    pub fn sepolia() -> Self {
        Self {
            name: "sepolia".to_string(),
            chain_id: 11155111,
            exchange: address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF"),
            factory: address!("0xcfFa6a5951B3b01B1b08E386Ac1fb4B567eCc9fD"),
            // Same reserve asset address is registered on both networks
            reserve_token: address!("0x54ceABC39627d9cEB578BB5fC4CE3DB972b2ce69"),
            rpc_url: "https://endpoints.omniatech.io/v1/eth/sepolia/public".to_string(),
        }
    }

    /// Resolves a registered network by its case-insensitive name.
    pub fn by_name(name: &str) -> Result<Self, SdkError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::mainnet()),
            "sepolia" => Ok(Self::sepolia()),
            _ => Err(SdkError::UnsupportedNetwork(name.to_string())),
        }
    }

    pub fn custom(
        name: impl Into<String>,
        chain_id: u64,
        exchange: Address,
        factory: Address,
        reserve_token: Address,
        rpc_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            chain_id,
            exchange,
            factory,
            reserve_token,
            rpc_url: rpc_url.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn exchange(&self) -> Address {
        self.exchange
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn reserve_token(&self) -> Address {
        self.reserve_token
    }

    /// Public endpoint for read-only access without a signing agent.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Zero address sentinel.
    pub fn zero_address(&self) -> Address {
        Address::ZERO
    }
}

impl FromStr for Chain {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::by_name(s)
    }
}
