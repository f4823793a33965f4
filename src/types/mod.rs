mod event;
mod outcome;
mod token;

use std::fmt;

use alloy::primitives::{Address, U256};

pub use event::*;
pub use outcome::{AllowanceOutcome, TradeReceipt};
pub use token::{NewToken, TokenConfig};

use crate::error::SdkError;

/// Identifier of a submitted state-changing transaction.
pub type TxId = alloy::primitives::TxHash;

/// Logical SDK operation, named after the contract function it maps to.
///
/// Carried by errors and log records for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Initialize,
    Buy,
    Sell,
    Quote,
    TokenFactory,
    Allowance,
    Approve,
    DepositReserve,
    BalanceOf,
    Transfer,
    TransferFrom,
    Symbol,
    Name,
    Decimals,
    TotalSupply,
    CreateToken,
    TokenConfig,
    TokenConfigs,
    ListTokens,
    TokensCreatedBy,
    IsTokenFromFactory,
    TotalCreatedTokens,
    TokensBatch,
    DefaultReserveToken,
    ExchangeAddress,
    Owner,
    InitializeFactory,
    TransferOwnership,
    RenounceOwnership,
    Receipt,
    Logs,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::Buy => "buyToken",
            Operation::Sell => "sellToken",
            Operation::Quote => "calculateExchangeAmount",
            Operation::TokenFactory => "tokenFactory",
            Operation::Allowance => "allowance",
            Operation::Approve => "approve",
            Operation::DepositReserve => "depositReserveToken",
            Operation::BalanceOf => "balanceOf",
            Operation::Transfer => "transfer",
            Operation::TransferFrom => "transferFrom",
            Operation::Symbol => "symbol",
            Operation::Name => "name",
            Operation::Decimals => "decimals",
            Operation::TotalSupply => "totalSupply",
            Operation::CreateToken => "createToken",
            Operation::TokenConfig => "getTokenConfig",
            Operation::TokenConfigs => "tokenConfigs",
            Operation::ListTokens => "listAllTokens",
            Operation::TokensCreatedBy => "tokensCreatedBy",
            Operation::IsTokenFromFactory => "isTokenFromFactory",
            Operation::TotalCreatedTokens => "totalCreatedTokens",
            Operation::TokensBatch => "getTokensBatch",
            Operation::DefaultReserveToken => "defaultReserveToken",
            Operation::ExchangeAddress => "exchangeAddress",
            Operation::Owner => "owner",
            Operation::InitializeFactory => "initializeFactory",
            Operation::TransferOwnership => "transferOwnership",
            Operation::RenounceOwnership => "renounceOwnership",
            Operation::Receipt => "getTransactionReceipt",
            Operation::Logs => "getLogs",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an exchange trade.
///
/// * [`TradeOp::Buy`] spends reserve asset to receive curve tokens.
/// * [`TradeOp::Sell`] spends curve tokens to receive reserve asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TradeOp {
    Buy,
    Sell,
}

impl TradeOp {
    pub fn operation(&self) -> Operation {
        match self {
            TradeOp::Buy => Operation::Buy,
            TradeOp::Sell => Operation::Sell,
        }
    }

    pub fn is_buying(&self) -> bool {
        matches!(self, TradeOp::Buy)
    }
}

impl From<bool> for TradeOp {
    fn from(is_buying: bool) -> Self {
        if is_buying { TradeOp::Buy } else { TradeOp::Sell }
    }
}

/// Parses a textual address.
///
/// All-lowercase and all-uppercase hex is accepted as is, mixed case must carry
/// a valid EIP-55 checksum.
pub fn parse_address(value: &str) -> Result<Address, SdkError> {
    let value = value.trim();
    let hex = value.strip_prefix("0x").unwrap_or(value);
    let mixed_case = hex.chars().any(|c| c.is_ascii_lowercase())
        && hex.chars().any(|c| c.is_ascii_uppercase());
    let parsed = if mixed_case {
        Address::parse_checksummed(value, None).map_err(|e| e.to_string())
    } else {
        value.parse::<Address>().map_err(|e| e.to_string())
    };
    parsed.map_err(|e| SdkError::InvalidAddress(format!("{value}: {e}")))
}

/// Canonical EIP-55 checksummed form of the address.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Parses a non-negative integer amount given in base units.
pub fn parse_amount(value: &str) -> Result<U256, SdkError> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(value, 10),
    };
    parsed.map_err(|e| SdkError::InvalidAmount(format!("{value}: {e}")))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_parse_address_any_case() {
        let expected = address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF");
        assert_eq!(
            parse_address("0x2c4145a98611b2dc6ecfcd0bcc2a2f841e0916bf").unwrap(),
            expected
        );
        assert_eq!(
            parse_address("0x2C4145A98611B2DC6ECFCD0BCC2A2F841E0916BF").unwrap(),
            expected
        );
        assert_eq!(
            parse_address(" 0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF ").unwrap(),
            expected
        );
    }

    #[test]
    fn test_parse_address_bad_checksum() {
        assert!(matches!(
            parse_address("0x2C4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF"),
            Err(SdkError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_address("0x1234"),
            Err(SdkError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_checksum_form() {
        let addr = parse_address("0xcffa6a5951b3b01b1b08e386ac1fb4b567ecc9fd").unwrap();
        assert_eq!(checksum(&addr), "0xcfFa6a5951B3b01B1b08E386Ac1fb4B567eCc9fD");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000").unwrap(), U256::from(1000));
        assert_eq!(parse_amount("0x3e8").unwrap(), U256::from(1000));
        assert_eq!(
            parse_amount(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935"
            )
            .unwrap(),
            U256::MAX
        );
        assert!(matches!(parse_amount("-1"), Err(SdkError::InvalidAmount(_))));
        assert!(matches!(parse_amount("1.5"), Err(SdkError::InvalidAmount(_))));
    }

    #[test]
    fn test_trade_op() {
        assert_eq!(TradeOp::from(true), TradeOp::Buy);
        assert_eq!(TradeOp::from(false), TradeOp::Sell);
        assert_eq!(TradeOp::Buy.operation().to_string(), "buyToken");
        assert!(!TradeOp::Sell.is_buying());
    }
}
