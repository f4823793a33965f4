use std::{fmt::Display, time::Duration};

use alloy::{
    contract,
    primitives::{Address, Bytes, U256},
    sol_types::{self, SolInterface},
    transports,
};

use crate::{
    abi::{exchange::TokenExchange::TokenExchangeErrors, factory::TokenFactory::TokenFactoryErrors},
    connection::Role,
    types::Operation,
};

/// Call/transaction revert reason decoded by
/// the known contract ABIs or in a generic raw form
/// if can not be decoded.
#[derive(Debug)]
pub enum RevertReason {
    Exchange(TokenExchangeErrors),
    Factory(TokenFactoryErrors),
    Generic(String),
    Unknown,
}

/// Error returned by the RPC provider as a result of call or
/// transaction execution.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("transaction ran out of gas")]
    OutOfGas,

    #[error("transaction reverted: {0:?}")]
    Reverted(Box<RevertReason>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Failure to build a connection or a signing session.
///
/// Cloneable, so a single failed initialization attempt can be reported
/// to every caller waiting on it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint serves chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("no signing agent available")]
    AgentUnavailable,

    #[error("signing agent holds no key for {0}")]
    UnknownAccount(Address),

    #[error("{0} connection unavailable")]
    Unavailable(Role),

    #[error("connection not established within {0:?}")]
    Timeout(Duration),
}

/// Error returned by the SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("network {0:?} is not supported")]
    UnsupportedNetwork(String),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("session initialization failed: {0}")]
    SessionInitialization(#[source] ConnectionError),

    #[error("{contract} contract at {address} is not initialized")]
    ContractNotReady {
        contract: &'static str,
        address: Address,
    },

    #[error("{0} requires a signing session")]
    SigningUnavailable(Operation),

    #[error("{0} requires a known signing account")]
    AccountUnavailable(Operation),

    #[error("{operation} failed, target: {target}, amount: {}: {source}", display_amount(.amount))]
    Execution {
        operation: Operation,
        target: Address,
        amount: Option<U256>,
        #[source]
        source: CallError,
    },

    #[error("{operation} call to {target} failed: {source}")]
    Read {
        operation: Operation,
        target: Address,
        #[source]
        source: CallError,
    },

    #[error("unexpected {operation} response from {target}: {reason}")]
    Decode {
        operation: Operation,
        target: Address,
        reason: String,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: Operation,
        after: Duration,
    },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

fn display_amount(amount: &Option<U256>) -> String {
    amount.map_or_else(|| "-".to_string(), |a| a.to_string())
}

impl SdkError {
    /// Wraps failure of a read-only call, surfacing shape mismatches as [`SdkError::Decode`].
    pub(crate) fn read(operation: Operation, target: Address, err: impl Into<CallError>) -> Self {
        match err.into() {
            CallError::Decode(reason) => Self::Decode {
                operation,
                target,
                reason,
            },
            source => Self::Read {
                operation,
                target,
                source,
            },
        }
    }

    pub(crate) fn execution(
        operation: Operation,
        target: Address,
        amount: Option<U256>,
        err: impl Into<CallError>,
    ) -> Self {
        Self::Execution {
            operation,
            target,
            amount,
            source: err.into(),
        }
    }

    /// Decoded revert reason, if the failure was a revert.
    pub fn revert_reason(&self) -> Option<&RevertReason> {
        match self {
            Self::Execution {
                source: CallError::Reverted(reason),
                ..
            }
            | Self::Read {
                source: CallError::Reverted(reason),
                ..
            } => Some(reason.as_ref()),
            _ => None,
        }
    }
}

impl From<contract::Error> for CallError {
    fn from(value: contract::Error) -> Self {
        match value {
            contract::Error::UnknownFunction(_) => Self::Fatal(value.to_string()),
            contract::Error::UnknownSelector(_) => Self::Fatal(value.to_string()),
            contract::Error::NotADeploymentTransaction => Self::Fatal(value.to_string()),
            contract::Error::ContractNotDeployed => Self::Fatal(value.to_string()),
            contract::Error::ZeroData(_, _) => Self::Decode(value.to_string()),
            contract::Error::AbiError(_) => Self::Decode(value.to_string()),
            contract::Error::TransportError(rpc_err) => Self::from(rpc_err),
            contract::Error::PendingTransactionError(err) => Self::Transport(err.to_string()),
        }
    }
}

impl<E: Display> From<transports::RpcError<E>> for CallError {
    fn from(value: transports::RpcError<E>) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                // Heuristic to determine if eth_call failed due to OutOfGas or
                // if transaction was reverted during the gas estimation
                let msg = resp.message.to_ascii_lowercase();
                if (resp.code == -32603) && (msg.contains("gas") || msg.contains("oog")) {
                    Self::OutOfGas
                } else if (resp.code == -32600 || resp.code == -32601 || resp.code == -32602)
                    && (msg.contains("invalid") || msg.contains("not found"))
                {
                    Self::InvalidRequest(msg)
                } else if (resp.code == 3 || resp.code == -32000) && msg.contains("reverted") {
                    Self::Reverted(Box::new(RevertReason::from(value)))
                } else {
                    Self::Transport(value.to_string())
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            transports::RpcError::DeserError { .. } => Self::Decode(value.to_string()),
            _ => Self::Transport(value.to_string()),
        }
    }
}

impl From<sol_types::Error> for CallError {
    fn from(value: sol_types::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl<E: Display> From<transports::RpcError<E>> for RevertReason {
    fn from(value: transports::RpcError<E>) -> Self {
        let Some(payload) = value.as_error_resp() else {
            return Self::Generic(value.to_string());
        };
        if let Some(known) = payload.as_decoded_interface_error::<TokenExchangeErrors>() {
            Self::Exchange(known)
        } else if let Some(known) = payload.as_decoded_interface_error::<TokenFactoryErrors>() {
            Self::Factory(known)
        } else {
            Self::Generic(value.to_string())
        }
    }
}

impl From<Bytes> for RevertReason {
    fn from(value: Bytes) -> Self {
        if value.is_empty() {
            Self::Unknown
        } else if let Ok(known) = TokenExchangeErrors::abi_decode(&value) {
            Self::Exchange(known)
        } else if let Ok(known) = TokenFactoryErrors::abi_decode(&value) {
            Self::Factory(known)
        } else {
            Self::Generic(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{primitives::address, sol_types::SolError};

    use super::*;
    use crate::abi::{exchange::TokenExchange, factory::TokenFactory};

    #[test]
    fn test_revert_reason_from_bytes() {
        let data = Bytes::from(SolError::abi_encode(&TokenExchange::Reentrancy {}));
        assert!(matches!(
            RevertReason::from(data),
            RevertReason::Exchange(TokenExchangeErrors::Reentrancy(_))
        ));

        let owner = address!("0x927294e922c3f8FbdC34Bd8b1875aE3D3e1637dF");
        let data = Bytes::from(SolError::abi_encode(
            &TokenFactory::OwnableUnauthorizedAccount { account: owner },
        ));
        assert!(matches!(
            RevertReason::from(data),
            RevertReason::Factory(TokenFactoryErrors::OwnableUnauthorizedAccount(e)) if e.account == owner
        ));

        assert!(matches!(
            RevertReason::from(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef])),
            RevertReason::Generic(_)
        ));
        assert!(matches!(RevertReason::from(Bytes::new()), RevertReason::Unknown));
    }

    #[test]
    fn test_read_error_classification() {
        let target = address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF");
        assert!(matches!(
            SdkError::read(Operation::TokenConfig, target, CallError::Decode("short".into())),
            SdkError::Decode {
                operation: Operation::TokenConfig,
                ..
            }
        ));
        assert!(matches!(
            SdkError::read(Operation::Quote, target, CallError::NullResp),
            SdkError::Read {
                operation: Operation::Quote,
                source: CallError::NullResp,
                ..
            }
        ));
    }

    #[test]
    fn test_execution_error_message() {
        let target = address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF");
        let err = SdkError::execution(
            Operation::Buy,
            target,
            Some(U256::from(1000)),
            CallError::Transport("user rejected".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("buyToken"));
        assert!(msg.contains("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF"));
        assert!(msg.contains("1000"));

        let err = SdkError::execution(
            Operation::RenounceOwnership,
            target,
            None,
            CallError::NullResp,
        );
        assert!(err.to_string().contains("amount: -"));
    }
}
