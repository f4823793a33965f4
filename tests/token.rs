use std::sync::Arc;

use alloy::{
    primitives::{Address, U256, address},
    sol_types::{SolCall, SolValue},
};
use bonding_sdk::{
    Chain,
    abi::erc20::IERC20,
    contract::Erc20Token,
    error::SdkError,
    session::{SessionManager, Settings},
    testing::{MockConnector, MockNode},
    types::Operation,
};
use tokio_test::assert_ok;

const CHAIN_ID: u64 = 1;
const HOLDER: Address = address!("0x00000000000000000000000000000000000000e1");
const SPENDER: Address = address!("0x00000000000000000000000000000000000000e2");
const TOKEN: Address = address!("0x00000000000000000000000000000000000000f0");

fn manager(node: &MockNode, agent: bool) -> Arc<SessionManager<MockConnector>> {
    let mut connector = MockConnector::new(node.clone());
    if agent {
        connector = connector.with_agent(vec![HOLDER]);
    }
    Arc::new(SessionManager::new(
        Chain::mainnet(),
        connector,
        Settings::default(),
    ))
}

#[tokio::test]
async fn test_token_metadata() {
    let node = MockNode::new(CHAIN_ID);
    node.on_call(TOKEN, IERC20::nameCall::SELECTOR, "Reserve".to_string().abi_encode());
    node.on_call(TOKEN, IERC20::symbolCall::SELECTOR, "RSV".to_string().abi_encode());
    node.on_call(TOKEN, IERC20::decimalsCall::SELECTOR, <alloy::sol_types::sol_data::Uint<8> as alloy::sol_types::SolType>::abi_encode(&18u8));
    node.on_call(
        TOKEN,
        IERC20::totalSupplyCall::SELECTOR,
        U256::MAX.abi_encode(),
    );

    let token = Erc20Token::new(manager(&node, false), TOKEN);
    assert!(!token.is_ready());
    assert_ok!(token.initialize().await);
    assert!(token.is_ready());

    assert_eq!(token.name().await.unwrap(), "Reserve");
    assert_eq!(token.symbol().await.unwrap(), "RSV");
    assert_eq!(token.decimals().await.unwrap(), 18);
    assert_eq!(token.total_supply().await.unwrap(), U256::MAX);
}

#[tokio::test]
async fn test_reserve_token_address() {
    let node = MockNode::new(CHAIN_ID);
    let token = Erc20Token::reserve(manager(&node, false));
    assert_eq!(token.address(), Chain::mainnet().reserve_token());
    assert!(matches!(
        token.balance_of(HOLDER).await,
        Err(SdkError::ContractNotReady { contract: "ERC20", address }) if address == Chain::mainnet().reserve_token()
    ));
}

#[tokio::test]
async fn test_balance_and_allowance() {
    let node = MockNode::new(CHAIN_ID);
    node.on_calldata(
        TOKEN,
        IERC20::balanceOfCall { owner: HOLDER }.abi_encode(),
        U256::from(42).abi_encode(),
    );
    node.set_allowance(TOKEN, HOLDER, SPENDER, U256::from(7));

    let token = Erc20Token::new(manager(&node, false), TOKEN);
    token.initialize().await.unwrap();

    assert_eq!(token.balance_of(HOLDER).await.unwrap(), U256::from(42));
    assert_eq!(token.allowance(HOLDER, SPENDER).await.unwrap(), U256::from(7));
}

/// Approval submitted by the signing account is reflected by later allowance reads.
#[tokio::test]
async fn test_approve_updates_allowance() {
    let node = MockNode::new(CHAIN_ID);
    node.set_allowance(TOKEN, HOLDER, SPENDER, U256::ZERO);
    let token = Erc20Token::new(manager(&node, true), TOKEN);
    token.initialize().await.unwrap();

    let tx = token.approve(SPENDER, U256::from(1000)).await.unwrap();

    let sent = node.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hash, tx);
    assert_eq!(sent[0].from, Some(HOLDER));
    assert_eq!(sent[0].to, TOKEN);
    assert_eq!(token.allowance(HOLDER, SPENDER).await.unwrap(), U256::from(1000));
}

#[tokio::test]
async fn test_transfers() {
    let node = MockNode::new(CHAIN_ID);
    let token = Erc20Token::new(manager(&node, true), TOKEN);
    token.initialize().await.unwrap();

    token.transfer(SPENDER, U256::from(5)).await.unwrap();
    token
        .transfer_from(SPENDER, HOLDER, U256::from(3))
        .await
        .unwrap();

    let sent = node.sent();
    let transfer = sent[0].decode::<IERC20::transferCall>().unwrap();
    assert_eq!(transfer.to, SPENDER);
    assert_eq!(transfer.amount, U256::from(5));
    let transfer_from = sent[1].decode::<IERC20::transferFromCall>().unwrap();
    assert_eq!(transfer_from.from, SPENDER);
    assert_eq!(transfer_from.to, HOLDER);
    assert_eq!(transfer_from.amount, U256::from(3));
}

#[tokio::test]
async fn test_write_without_agent() {
    let node = MockNode::new(CHAIN_ID);
    let token = Erc20Token::new(manager(&node, false), TOKEN);
    token.initialize().await.unwrap();

    assert!(matches!(
        token.transfer(SPENDER, U256::from(1)).await,
        Err(SdkError::SigningUnavailable(Operation::Transfer))
    ));
    assert!(node.sent().is_empty());
}
