use std::sync::Arc;

use alloy::{
    primitives::{Address, U256, address},
    sol_types::{SolCall, SolError, SolEvent, SolValue},
};
use bonding_sdk::{
    Chain,
    abi::factory::TokenFactory::{self as Factory, TokenFactoryErrors},
    contract::TokenFactory,
    error::{RevertReason, SdkError},
    session::{SessionManager, Settings},
    testing::{MockConnector, MockNode},
    types::{Operation, TokenConfig},
};
use tokio_test::assert_ok;

const CHAIN_ID: u64 = 11155111;
const CREATOR: Address = address!("0x00000000000000000000000000000000000000c0");
const TOKEN: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
const RESERVE: Address = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

async fn setup() -> (MockNode, TokenFactory<MockConnector>) {
    let node = MockNode::new(CHAIN_ID);
    let connector = MockConnector::new(node.clone()).with_agent(vec![CREATOR]);
    let manager = Arc::new(SessionManager::new(
        Chain::sepolia(),
        connector,
        Settings::default(),
    ));
    let factory = TokenFactory::new(manager);
    assert_ok!(factory.initialize().await);
    (node, factory)
}

/// Nested `(tuple, uint256)` response decodes in field order, ignoring the trailing value.
#[tokio::test]
async fn test_get_token_config() {
    let (node, factory) = setup().await;
    node.on_call(
        factory.address(),
        Factory::getTokenConfigCall::SELECTOR,
        (
            Factory::TokenConfig {
                tokenAddress: TOKEN,
                reserveToken: RESERVE,
                slope: U256::from(500),
                reserveWeight: U256::from(10),
            },
            U256::from(1_000_000),
        )
            .abi_encode_params(),
    );

    let config = factory.get_token_config(TOKEN).await.unwrap();
    assert_eq!(
        config,
        TokenConfig {
            token_address: TOKEN,
            reserve_token: RESERVE,
            slope: U256::from(500),
            reserve_weight: U256::from(10),
        }
    );
    assert_eq!(config.slope.to_string(), "500");
    assert_eq!(config.reserve_weight.to_string(), "10");
}

#[tokio::test]
async fn test_token_config_wide_values() {
    let (node, factory) = setup().await;
    node.on_call(
        factory.address(),
        Factory::tokenConfigsCall::SELECTOR,
        (TOKEN, RESERVE, U256::MAX, U256::MAX - U256::from(1)).abi_encode_params(),
    );

    let config = factory.token_configs(TOKEN).await.unwrap();
    assert_eq!(config.slope, U256::MAX);
    assert_eq!(config.reserve_weight, U256::MAX - U256::from(1));
    assert_eq!(config.reserve_token, RESERVE);
}

/// Response shape mismatch surfaces as a decode error instead of defaults.
#[tokio::test]
async fn test_get_token_config_malformed() {
    let (node, factory) = setup().await;
    node.on_call(
        factory.address(),
        Factory::getTokenConfigCall::SELECTOR,
        U256::from(1).abi_encode(),
    );
    assert!(matches!(
        factory.get_token_config(TOKEN).await,
        Err(SdkError::Decode {
            operation: Operation::TokenConfig,
            ..
        })
    ));

    node.on_call(
        factory.address(),
        Factory::getTokenConfigCall::SELECTOR,
        Vec::<u8>::new(),
    );
    assert!(matches!(
        factory.get_token_config(TOKEN).await,
        Err(SdkError::Decode { .. })
    ));
}

#[tokio::test]
async fn test_enumeration_helpers() {
    let (node, factory) = setup().await;
    let address = factory.address();
    let tokens = vec![TOKEN, RESERVE];
    node.on_call(address, Factory::listAllTokensCall::SELECTOR, tokens.abi_encode());
    node.on_call(
        address,
        Factory::tokensCreatedByCall::SELECTOR,
        vec![TOKEN].abi_encode(),
    );
    node.on_call(
        address,
        Factory::getTokensBatchCall::SELECTOR,
        vec![RESERVE].abi_encode(),
    );
    node.on_call(address, Factory::isTokenFromFactoryCall::SELECTOR, true.abi_encode());
    node.on_call(
        address,
        Factory::totalCreatedTokensCall::SELECTOR,
        U256::from(2).abi_encode(),
    );

    assert_eq!(factory.list_all_tokens().await.unwrap(), tokens);
    assert_eq!(factory.tokens_created_by(CREATOR).await.unwrap(), vec![TOKEN]);
    assert_eq!(
        factory
            .tokens_batch(U256::from(1), U256::from(2))
            .await
            .unwrap(),
        vec![RESERVE]
    );
    assert!(factory.is_token_from_factory(TOKEN).await.unwrap());
    assert_eq!(factory.total_created_tokens().await.unwrap(), U256::from(2));
}

#[tokio::test]
async fn test_factory_settings_reads() {
    let (node, factory) = setup().await;
    let address = factory.address();
    let chain = Chain::sepolia();
    node.on_call(
        address,
        Factory::defaultReserveTokenCall::SELECTOR,
        chain.reserve_token().abi_encode(),
    );
    node.on_call(
        address,
        Factory::exchangeAddressCall::SELECTOR,
        chain.exchange().abi_encode(),
    );
    node.on_call(address, Factory::ownerCall::SELECTOR, CREATOR.abi_encode());

    assert_eq!(
        factory.default_reserve_token().await.unwrap(),
        chain.reserve_token()
    );
    assert_eq!(factory.exchange_address().await.unwrap(), chain.exchange());
    assert_eq!(factory.owner().await.unwrap(), CREATOR);
}

#[tokio::test]
async fn test_create_token_and_wait() {
    let (node, factory) = setup().await;
    node.emit_on_send(
        Factory::createTokenCall::SELECTOR,
        factory.address(),
        Factory::TokenCreated {
            tokenAddress: TOKEN,
            creator: CREATOR,
        }
        .encode_log_data(),
    );

    let params = factory
        .new_token(
            "Cat",
            "CAT",
            U256::from(10).pow(U256::from(24)),
            U256::from(500_000),
            U256::from(3),
        )
        .unwrap();
    let (tx, token) = factory.create_token_and_wait(params).await.unwrap();
    assert_eq!(token, TOKEN);

    let sent = node.sent_with(Factory::createTokenCall::SELECTOR);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hash, tx);
    let call = sent[0].decode::<Factory::createTokenCall>().unwrap();
    assert_eq!(call.name, "Cat");
    assert_eq!(call.symbol, "CAT");
    assert_eq!(call.initialSupply, U256::from(10).pow(U256::from(24)));
    assert_eq!(call.reserveWeight, U256::from(500_000));
    assert_eq!(call.slope, U256::from(3));
    assert_eq!(call.creator, CREATOR);
    assert_eq!(call.reserveTokenAddress, Chain::sepolia().reserve_token());
    assert_eq!(call._exchangeAddress, Chain::sepolia().exchange());
}

#[tokio::test]
async fn test_create_token_without_event() {
    let (node, factory) = setup().await;
    let params = factory
        .new_token("Dog", "DOG", U256::from(1), U256::from(1), U256::from(1))
        .unwrap();

    let tx = factory.create_token(params.clone()).await.unwrap();
    assert_eq!(node.sent()[0].hash, tx);

    assert!(matches!(
        factory.create_token_and_wait(params).await,
        Err(SdkError::Decode {
            operation: Operation::CreateToken,
            ..
        })
    ));
}

#[tokio::test]
async fn test_ownership() {
    let (node, factory) = setup().await;
    let new_owner = address!("0x00000000000000000000000000000000000000d0");

    factory.transfer_ownership(new_owner).await.unwrap();
    factory.renounce_ownership().await.unwrap();
    factory
        .initialize_factory(Chain::sepolia().reserve_token())
        .await
        .unwrap();

    let sent = node.sent();
    assert_eq!(
        sent[0]
            .decode::<Factory::transferOwnershipCall>()
            .unwrap()
            .newOwner,
        new_owner
    );
    assert!(sent[1].decode::<Factory::renounceOwnershipCall>().is_some());
    assert_eq!(
        sent[2]
            .decode::<Factory::initializeCall>()
            .unwrap()
            ._defaultReserveToken,
        Chain::sepolia().reserve_token()
    );
}

#[tokio::test]
async fn test_factory_revert_decoded() {
    let (node, factory) = setup().await;
    node.revert_call(
        factory.address(),
        Factory::ownerCall::SELECTOR,
        SolError::abi_encode(&Factory::OwnableUnauthorizedAccount { account: CREATOR }),
    );

    let err = factory.owner().await.unwrap_err();
    assert!(matches!(
        err.revert_reason(),
        Some(RevertReason::Factory(TokenFactoryErrors::OwnableUnauthorizedAccount(e))) if e.account == CREATOR
    ));
}
