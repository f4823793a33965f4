use alloy::primitives::U256;

use super::TxId;

/// Result of an allowance check-then-approve sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// Current allowance already covers the requested amount, nothing submitted.
    Sufficient { current: U256 },
    /// Approval for exactly the requested amount was submitted and confirmed.
    Approved { previous: U256, tx: TxId },
}

impl AllowanceOutcome {
    /// Approval transaction, if one was needed.
    pub fn approval(&self) -> Option<TxId> {
        match self {
            AllowanceOutcome::Sufficient { .. } => None,
            AllowanceOutcome::Approved { tx, .. } => Some(*tx),
        }
    }
}

/// Single outcome of a trade preceded by an allowance check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeReceipt {
    pub approval: Option<TxId>,
    pub trade: TxId,
}
