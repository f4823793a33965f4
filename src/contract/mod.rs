//! Contract facades.
//!
//! Each facade binds a contract address to the session of a shared
//! [`SessionManager`]. Binding is explicit: `initialize()` awaits the session
//! and must complete before any other method, which otherwise fails fast with
//! [`SdkError::ContractNotReady`]. `initialize()` is idempotent.
//!
//! Reads go through the read-only connection, writes are encoded into
//! calldata and submitted through the signing session by a single executor.
//! Failed submissions are never retried.

mod exchange;
mod factory;
mod token;

use std::{
    future::IntoFuture,
    sync::{Arc, OnceLock},
};

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, U256},
    providers::{DynProvider, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use tracing::{debug, error, info};

pub use exchange::TokenExchange;
pub use factory::TokenFactory;
pub use token::Erc20Token;

use crate::{
    connection::{Connector, Signer},
    error::{CallError, RevertReason, SdkError},
    session::{Session, SessionManager, Settings, deadline},
    types::{Operation, TxId},
};

/// Ready session along with the settings of its manager.
#[derive(Clone, Debug)]
pub(crate) struct Binding {
    session: Arc<Session>,
    settings: Settings,
}

impl Binding {
    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn reader(&self) -> DynProvider {
        self.session.read_only().clone()
    }

    pub(crate) fn signer(&self, operation: Operation) -> Result<&Signer, SdkError> {
        self.session
            .signer()
            .ok_or(SdkError::SigningUnavailable(operation))
    }

    /// Account the signing session sends from.
    pub(crate) fn account(&self, operation: Operation) -> Result<Address, SdkError> {
        self.signer(operation)?
            .account()
            .ok_or(SdkError::AccountUnavailable(operation))
    }

    /// Awaits a read-only call against `target`.
    pub(crate) async fn read<T, F, E>(
        &self,
        operation: Operation,
        target: Address,
        call: F,
    ) -> Result<T, SdkError>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: Into<CallError>,
    {
        deadline(self.settings.call_timeout, operation, async {
            call.await.map_err(|e| SdkError::read(operation, target, e))
        })
        .await
    }

    /// Submits encoded calldata to `to` through the signing session.
    ///
    /// `target` and `amount` identify the subject of the operation in logs and errors.
    pub(crate) async fn submit(
        &self,
        operation: Operation,
        target: Address,
        amount: Option<U256>,
        to: Address,
        calldata: Vec<u8>,
    ) -> Result<TxId, SdkError> {
        let signer = self.signer(operation)?;
        let mut tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        if let Some(from) = signer.account() {
            tx = tx.with_from(from);
        }

        info!(%operation, %target, ?amount, %to, "Submitting transaction");
        let result = deadline(self.settings.call_timeout, operation, async {
            signer
                .provider()
                .send_transaction(tx)
                .await
                .map(|pending| *pending.tx_hash())
                .map_err(|e| SdkError::execution(operation, target, amount, e))
        })
        .await;
        match &result {
            Ok(tx) => info!(%operation, %target, %tx, "Transaction submitted"),
            Err(err) => error!(%operation, %target, %err, "Transaction submission failed"),
        }
        result
    }

    /// Waits for the receipt and the configured confirmations, failing if the transaction reverted.
    pub(crate) async fn confirm(
        &self,
        operation: Operation,
        target: Address,
        amount: Option<U256>,
        tx: TxId,
    ) -> Result<TransactionReceipt, SdkError> {
        let provider = self.signer(operation)?.provider();
        let confirmations = self.settings.confirmations;
        let wait = async {
            let poll_interval = provider.client().poll_interval();
            let receipt = loop {
                let receipt = provider
                    .get_transaction_receipt(tx)
                    .await
                    .map_err(|e| SdkError::read(Operation::Receipt, target, e))?;
                match receipt {
                    Some(receipt) => break receipt,
                    None => tokio::time::sleep(poll_interval).await,
                }
            };
            if let Some(mined_at) = receipt.block_number {
                while confirmations > 1 {
                    let head = provider
                        .get_block_number()
                        .await
                        .map_err(|e| SdkError::read(Operation::Receipt, target, e))?;
                    if head + 1 >= mined_at + confirmations {
                        break;
                    }
                    tokio::time::sleep(poll_interval).await;
                }
            }
            Ok::<_, SdkError>(receipt)
        };

        let after = self.settings.receipt_timeout;
        let receipt = tokio::time::timeout(after, wait)
            .await
            .map_err(|_| SdkError::Timeout { operation, after })??;
        if !receipt.status() {
            error!(%operation, %target, %tx, "Transaction reverted");
            return Err(SdkError::execution(
                operation,
                target,
                amount,
                CallError::Reverted(Box::new(RevertReason::Unknown)),
            ));
        }
        debug!(%operation, %tx, block = ?receipt.block_number, "Transaction confirmed");
        Ok(receipt)
    }
}

/// Facade state shared by all contract roles.
#[derive(derive_more::Debug)]
pub(crate) struct Bound<C> {
    contract: &'static str,
    address: Address,
    #[debug(skip)]
    manager: Arc<SessionManager<C>>,
    binding: OnceLock<Binding>,
}

impl<C: Connector> Bound<C> {
    pub(crate) fn new(contract: &'static str, address: Address, manager: Arc<SessionManager<C>>) -> Self {
        Self {
            contract,
            address,
            manager,
            binding: OnceLock::new(),
        }
    }

    pub(crate) fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn manager(&self) -> &Arc<SessionManager<C>> {
        &self.manager
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.binding.get().is_some()
    }

    pub(crate) async fn initialize(&self) -> Result<(), SdkError> {
        if self.is_ready() {
            return Ok(());
        }
        let session = self.manager.ensure_ready().await?;
        let binding = Binding {
            session,
            settings: *self.manager.settings(),
        };
        if self.binding.set(binding).is_ok() {
            info!(contract = self.contract, address = %self.address, "Contract bound");
        }
        Ok(())
    }

    pub(crate) fn binding(&self) -> Result<&Binding, SdkError> {
        self.binding.get().ok_or(SdkError::ContractNotReady {
            contract: self.contract,
            address: self.address,
        })
    }
}
