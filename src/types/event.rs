use alloy::primitives::TxHash;

/// Events emitted within a specific block.
#[derive(Debug)]
pub struct BlockEvents<T> {
    block_number: u64,
    block_timestamp: u64,
    events: Vec<T>,
}

/// Event along with transaction context.
#[derive(Debug)]
pub struct EventContext<T> {
    pub(crate) tx_hash: TxHash,
    pub(crate) tx_index: u64,
    pub(crate) log_index: u64,
    pub(crate) event: T,
}

impl<T> BlockEvents<T> {
    pub(crate) fn new(block_number: u64, block_timestamp: u64, events: Vec<T>) -> Self {
        Self {
            block_number,
            block_timestamp,
            events,
        }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Block timestamp, zero if the node does not report it with logs.
    pub fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }

    pub fn events(&self) -> &[T] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<T> EventContext<T> {
    pub(crate) fn new(tx_hash: TxHash, tx_index: u64, log_index: u64, event: T) -> Self {
        Self {
            tx_hash,
            tx_index,
            log_index,
            event,
        }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    pub fn log_index(&self) -> u64 {
        self.log_index
    }

    pub fn event(&self) -> &T {
        &self.event
    }
}
