//! In-process testing environment and test utilities.
//!
//! [`MockNode`] is a JSON-RPC transport answering the node methods the SDK
//! relies on: `eth_chainId`, `eth_blockNumber`, `eth_call`,
//! `eth_sendTransaction`, `eth_getTransactionReceipt` and `eth_getLogs`.
//! Contract calls are answered from scripted replies keyed by contract address
//! and selector (or exact calldata), every submitted transaction is recorded
//! and mined into its own block with a successful receipt. Submitted ERC20
//! approvals update the allowance the node reports afterwards. Answers can be
//! delayed or failed per method, and receipts withheld.
//!
//! [`MockConnector`] builds sessions on top of a [`MockNode`], counting
//! connection attempts and optionally failing, hanging or delaying them.
//!

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use alloy::{
    primitives::{Address, B256, Bytes, LogData, Selector, TxHash, U256, keccak256},
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    sol_types::{SolCall, SolValue},
    transports::{TransportError, TransportFut},
};
use alloy_json_rpc::{
    ErrorPayload, RequestPacket, Response, ResponsePacket, ResponsePayload, SerializedRequest,
};
use dashmap::{DashMap, DashSet};
use serde_json::{Value, json, value::to_raw_value};
use tower::Service;

use crate::{
    abi::erc20::IERC20,
    connection::{Connector, Role},
    error::ConnectionError,
};

const GENESIS_BLOCK: u64 = 100;
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const BLOCK_TIME_SEC: u64 = 12;

#[derive(Clone, Debug)]
enum Reply {
    Return(Bytes),
    Revert(Bytes),
}

/// Transaction submitted to the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTx {
    pub hash: TxHash,
    pub block_number: u64,
    pub from: Option<Address>,
    pub to: Address,
    pub input: Bytes,
}

impl SentTx {
    pub fn selector(&self) -> Option<Selector> {
        self.input.get(..4).map(Selector::from_slice)
    }

    /// Decodes the calldata as the given call, if it matches.
    pub fn decode<C: SolCall>(&self) -> Option<C> {
        C::abi_decode(&self.input).ok()
    }
}

#[derive(Debug)]
struct StoredLog {
    block: u64,
    tx_hash: TxHash,
    log_index: u64,
    address: Address,
    data: LogData,
}

#[derive(Debug, Default)]
struct NodeState {
    chain_id: u64,
    block_number: AtomicU64,
    exact: DashMap<(Address, Bytes), Reply>,
    replies: DashMap<(Address, Selector), Reply>,
    emitted: DashMap<Selector, Vec<(Address, LogData)>>,
    reverting: DashSet<Selector>,
    send_error: Mutex<Option<String>>,
    sent: Mutex<Vec<SentTx>>,
    logs: Mutex<Vec<StoredLog>>,
    receipts: DashMap<TxHash, Value>,
    withheld_receipts: AtomicBool,
    latency: DashMap<String, Duration>,
    failing: DashMap<String, String>,
}

/// Scripted JSON-RPC node.
#[derive(Clone, Debug)]
pub struct MockNode {
    state: Arc<NodeState>,
}

impl MockNode {
    pub fn new(chain_id: u64) -> Self {
        Self {
            state: Arc::new(NodeState {
                chain_id,
                block_number: AtomicU64::new(GENESIS_BLOCK),
                ..Default::default()
            }),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.state.chain_id
    }

    /// Provider without fillers, submitting transactions unsigned via `eth_sendTransaction`.
    pub fn provider(&self) -> DynProvider {
        let client = RpcClient::new(self.clone(), true);
        client.set_poll_interval(Duration::from_millis(50));
        DynProvider::new(
            ProviderBuilder::new()
                .disable_recommended_fillers()
                .connect_client(client),
        )
    }

    /// Answers calls of `selector` on `to` with the ABI-encoded `output`.
    pub fn on_call(&self, to: Address, selector: impl Into<Selector>, output: impl Into<Bytes>) {
        self.state
            .replies
            .insert((to, selector.into()), Reply::Return(output.into()));
    }

    /// Answers calls on `to` with exactly this calldata, taking precedence over [`MockNode::on_call`].
    pub fn on_calldata(&self, to: Address, calldata: impl Into<Bytes>, output: impl Into<Bytes>) {
        self.state
            .exact
            .insert((to, calldata.into()), Reply::Return(output.into()));
    }

    /// Reverts calls of `selector` on `to` with the given revert data.
    pub fn revert_call(&self, to: Address, selector: impl Into<Selector>, data: impl Into<Bytes>) {
        self.state
            .replies
            .insert((to, selector.into()), Reply::Revert(data.into()));
    }

    /// Allowance reported by the `token` for the given owner and spender.
    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.on_calldata(
            token,
            IERC20::allowanceCall { owner, spender }.abi_encode(),
            amount.abi_encode(),
        );
    }

    /// Adds a log to the receipt of every successful transaction with the given selector.
    pub fn emit_on_send(&self, selector: impl Into<Selector>, emitter: Address, log: LogData) {
        self.state
            .emitted
            .entry(selector.into())
            .or_default()
            .push((emitter, log));
    }

    /// Mines transactions with the given selector with a failed status.
    pub fn revert_on_send(&self, selector: impl Into<Selector>) {
        self.state.reverting.insert(selector.into());
    }

    /// Rejects every following submission with the given message.
    pub fn fail_sends(&self, message: impl Into<String>) {
        *self
            .state
            .send_error
            .lock()
            .unwrap() = Some(message.into());
    }

    /// Answers every following receipt query with `null`, as for a transaction never mined.
    pub fn withhold_receipts(&self, withheld: bool) {
        self.state.withheld_receipts.store(withheld, Ordering::SeqCst);
    }

    /// Delays answers to `method` by `latency`, the answer reflecting the node state after it.
    pub fn delay(&self, method: &str, latency: Duration) {
        self.state.latency.insert(method.to_string(), latency);
    }

    /// Fails every following `method` request with a server error.
    pub fn fail(&self, method: &str, message: impl Into<String>) {
        self.state.failing.insert(method.to_string(), message.into());
    }

    /// Answers `method` normally again.
    pub fn recover(&self, method: &str) {
        self.state.failing.remove(method);
    }

    /// All submitted transactions, in submission order.
    pub fn sent(&self) -> Vec<SentTx> {
        self.state.sent.lock().unwrap().clone()
    }

    /// Submitted transactions with the given selector.
    pub fn sent_with(&self, selector: impl Into<Selector>) -> Vec<SentTx> {
        let selector = Some(selector.into());
        self.sent()
            .into_iter()
            .filter(|tx| tx.selector() == selector)
            .collect()
    }

    pub fn block_number(&self) -> u64 {
        self.state.block_number.load(Ordering::SeqCst)
    }

    /// Produces an empty block, returning its number.
    pub fn mine(&self) -> u64 {
        self.state.block_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Produces a block with a single log emitted by `address`, returning its number.
    pub fn emit(&self, address: Address, data: LogData) -> u64 {
        let block = self.mine();
        self.state.logs.lock().unwrap().push(StoredLog {
            block,
            tx_hash: keccak256(format!("log-{block}")),
            log_index: 0,
            address,
            data,
        });
        block
    }

    fn latency(&self, method: &str) -> Option<Duration> {
        self.state.latency.get(method).map(|l| *l)
    }

    fn respond(&self, request: &SerializedRequest) -> Response {
        let params = serde_json::from_str::<Value>(request.serialized().get())
            .ok()
            .and_then(|r| r.get("params").cloned())
            .and_then(|p| p.as_array().cloned())
            .unwrap_or_default();
        let payload = match self.handle(request.method(), &params) {
            Ok(value) => ResponsePayload::Success(to_raw_value(&value).unwrap()),
            Err(err) => ResponsePayload::Failure(err),
        };
        Response {
            id: request.id().clone(),
            payload,
        }
    }

    fn handle(&self, method: &str, params: &[Value]) -> Result<Value, ErrorPayload> {
        if let Some(message) = self.state.failing.get(method) {
            return Err(error(-32000, message.clone()));
        }
        let first = params.first().unwrap_or(&Value::Null);
        match method {
            "eth_chainId" => Ok(json!(format!("{:#x}", self.state.chain_id))),
            "eth_blockNumber" => Ok(json!(format!("{:#x}", self.block_number()))),
            "eth_call" => self.call(first),
            "eth_sendTransaction" => self.send(first),
            "eth_getTransactionReceipt" => Ok(hash_param(first)
                .filter(|_| !self.state.withheld_receipts.load(Ordering::SeqCst))
                .and_then(|hash| self.state.receipts.get(&hash).map(|r| r.clone()))
                .unwrap_or(Value::Null)),
            "eth_getLogs" => Ok(self.logs(first)),
            other => Err(error(-32601, format!("method {other} not found"))),
        }
    }

    fn call(&self, tx: &Value) -> Result<Value, ErrorPayload> {
        let to = address_field(tx, "to").ok_or_else(|| error(-32602, "invalid params: missing to"))?;
        let input = input_field(tx);
        let reply = self
            .state
            .exact
            .get(&(to, input.clone()))
            .map(|r| r.clone())
            .or_else(|| {
                let selector = input.get(..4).map(Selector::from_slice)?;
                self.state.replies.get(&(to, selector)).map(|r| r.clone())
            });
        match reply {
            Some(Reply::Return(output)) => Ok(json!(output)),
            Some(Reply::Revert(data)) => Err(ErrorPayload {
                code: 3,
                message: "execution reverted".into(),
                data: Some(to_raw_value(&data).unwrap()),
            }),
            None => Err(error(-32603, format!("no reply scripted for call to {to}"))),
        }
    }

    fn send(&self, tx: &Value) -> Result<Value, ErrorPayload> {
        if let Some(message) = self.state.send_error.lock().unwrap().clone() {
            return Err(error(4001, message));
        }
        let to = address_field(tx, "to").ok_or_else(|| error(-32602, "invalid params: missing to"))?;
        let from = address_field(tx, "from");
        let input = input_field(tx);
        let selector = input.get(..4).map(Selector::from_slice);
        let reverted = selector.is_some_and(|s| self.state.reverting.contains(&s));

        let mut sent = self.state.sent.lock().unwrap();
        let hash = keccak256((sent.len() as u64).to_be_bytes());
        let block = self.mine();

        let mut logs = Vec::new();
        if !reverted {
            if let (Some(owner), Ok(approval)) = (from, IERC20::approveCall::abi_decode(&input)) {
                self.set_allowance(to, owner, approval.spender, approval.amount);
            }
            if let Some(emitted) = selector.and_then(|s| self.state.emitted.get(&s).map(|e| e.clone())) {
                let mut stored = self.state.logs.lock().unwrap();
                for (log_index, (address, data)) in emitted.into_iter().enumerate() {
                    let log = StoredLog {
                        block,
                        tx_hash: hash,
                        log_index: log_index as u64,
                        address,
                        data,
                    };
                    logs.push(log_json(&log));
                    stored.push(log);
                }
            }
        }

        self.state.receipts.insert(
            hash,
            json!({
                "type": "0x2",
                "status": if reverted { "0x0" } else { "0x1" },
                "cumulativeGasUsed": "0x5208",
                "logs": logs,
                "logsBloom": Bytes::from(vec![0u8; 256]),
                "transactionHash": hash,
                "transactionIndex": "0x0",
                "blockHash": block_hash(block),
                "blockNumber": format!("{block:#x}"),
                "gasUsed": "0x5208",
                "effectiveGasPrice": "0x1",
                "from": from.unwrap_or_default(),
                "to": to,
                "contractAddress": null,
            }),
        );
        sent.push(SentTx {
            hash,
            block_number: block,
            from,
            to,
            input,
        });
        Ok(json!(hash))
    }

    fn logs(&self, filter: &Value) -> Value {
        let from = quantity_field(filter, "fromBlock").unwrap_or_default();
        let to = quantity_field(filter, "toBlock").unwrap_or_else(|| self.block_number());
        let addresses = string_set(filter.get("address"));
        let topics0 = string_set(filter.get("topics").and_then(|t| t.get(0)));
        let logs = self.state.logs.lock().unwrap();
        Value::Array(
            logs.iter()
                .filter(|log| (from..=to).contains(&log.block))
                .filter(|log| {
                    addresses.is_empty()
                        || addresses
                            .iter()
                            .any(|a| a.parse::<Address>().is_ok_and(|a| a == log.address))
                })
                .filter(|log| {
                    topics0.is_empty()
                        || log.data.topics().first().is_some_and(|t0| {
                            topics0.iter().any(|t| t.parse::<B256>().is_ok_and(|t| t == *t0))
                        })
                })
                .map(log_json)
                .collect(),
        )
    }
}

impl Service<RequestPacket> for MockNode {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: RequestPacket) -> Self::Future {
        let node = self.clone();
        let latency = match &request {
            RequestPacket::Single(request) => node.latency(request.method()),
            RequestPacket::Batch(requests) => requests
                .iter()
                .filter_map(|r| node.latency(r.method()))
                .max(),
        };
        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            Ok(match request {
                RequestPacket::Single(request) => ResponsePacket::Single(node.respond(&request)),
                RequestPacket::Batch(requests) => {
                    ResponsePacket::Batch(requests.iter().map(|r| node.respond(r)).collect())
                }
            })
        })
    }
}

fn error(code: i64, message: impl Into<String>) -> ErrorPayload {
    ErrorPayload {
        code,
        message: message.into().into(),
        data: None,
    }
}

fn address_field(value: &Value, key: &str) -> Option<Address> {
    value.get(key)?.as_str()?.parse().ok()
}

fn input_field(tx: &Value) -> Bytes {
    tx.get("input")
        .or_else(|| tx.get("data"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

fn quantity_field(value: &Value, key: &str) -> Option<u64> {
    let hex = value.get(key)?.as_str()?;
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok()
}

fn hash_param(value: &Value) -> Option<TxHash> {
    value.as_str()?.parse().ok()
}

fn string_set(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn block_hash(block: u64) -> B256 {
    keccak256(block.to_be_bytes())
}

fn log_json(log: &StoredLog) -> Value {
    json!({
        "address": log.address,
        "topics": log.data.topics(),
        "data": log.data.data,
        "blockHash": block_hash(log.block),
        "blockNumber": format!("{:#x}", log.block),
        "blockTimestamp": format!("{:#x}", GENESIS_TIMESTAMP + log.block * BLOCK_TIME_SEC),
        "transactionHash": log.tx_hash,
        "transactionIndex": "0x0",
        "logIndex": format!("{:#x}", log.log_index),
        "removed": false,
    })
}

/// [`Connector`] building every connection over a [`MockNode`].
///
/// Without an agent only read-only connections are available. Attempts are
/// counted per read-only connection, i.e. once per session initialization.
#[derive(Clone, Debug)]
pub struct MockConnector {
    node: MockNode,
    agent: Option<Vec<Address>>,
    failures: Arc<AtomicU64>,
    hangs: Arc<AtomicU64>,
    attempts: Arc<AtomicU64>,
    delay: Duration,
}

impl MockConnector {
    pub fn new(node: MockNode) -> Self {
        Self {
            node,
            agent: None,
            failures: Arc::new(AtomicU64::new(0)),
            hangs: Arc::new(AtomicU64::new(0)),
            attempts: Arc::new(AtomicU64::new(0)),
            delay: Duration::ZERO,
        }
    }

    /// Makes a signing agent holding the given accounts available.
    pub fn with_agent(mut self, accounts: Vec<Address>) -> Self {
        self.agent = Some(accounts);
        self
    }

    /// Fails the first `count` read-only connection attempts.
    pub fn failing(self, count: u64) -> Self {
        self.failures.store(count, Ordering::SeqCst);
        self
    }

    /// Never completes the first `count` read-only connection attempts.
    pub fn hanging(self, count: u64) -> Self {
        self.hangs.store(count, Ordering::SeqCst);
        self
    }

    /// Delays every read-only connection attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn node(&self) -> &MockNode {
        &self.node
    }

    /// Number of read-only connection attempts so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    async fn connect(&self, role: Role) -> Result<Option<DynProvider>, ConnectionError> {
        match role {
            Role::ReadOnly => {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                if take_one(&self.hangs) {
                    std::future::pending::<()>().await;
                }
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if take_one(&self.failures) {
                    return Err(ConnectionError::Transport("connection refused".to_string()));
                }
                Ok(Some(self.node.provider()))
            }
            Role::Signing => Ok(self.agent.as_ref().map(|_| self.node.provider())),
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ConnectionError> {
        Ok(self.agent.clone().unwrap_or_default())
    }

    async fn connect_as(&self, account: Address) -> Result<DynProvider, ConnectionError> {
        let accounts = self.agent.as_ref().ok_or(ConnectionError::AgentUnavailable)?;
        if !accounts.contains(&account) {
            return Err(ConnectionError::UnknownAccount(account));
        }
        Ok(self.node.provider())
    }
}

fn take_one(counter: &AtomicU64) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
