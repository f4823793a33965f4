use std::time::Duration;

use alloy::{
    primitives::Address,
    providers::Provider,
    rpc::types::Filter,
    sol_types::{SolEvent, SolEventInterface},
};
use futures::{Stream, stream};

use crate::{
    abi::exchange::TokenExchange::{TokenBought, TokenExchangeEvents, TokenSold},
    error::SdkError,
    types::{self, Operation},
};

pub type TradeEvent = types::EventContext<TokenExchangeEvents>;
pub type TradeBlockEvents = types::BlockEvents<TradeEvent>;

/// Returns stream of trades executed by the exchange at the given address,
/// batched per block, starting from the specified block.
///
/// Polls logs via the given [`Provider`] to produce strictly continuous
/// sequence of blocks, waiting with [`Provider`]-configured interval for
/// blocks not produced yet. Failed polls are yielded as errors and retried
/// after the same interval.
pub fn trades<P, S, SFut>(
    exchange: Address,
    provider: P,
    from_block: u64,
    sleep: S,
) -> impl Stream<Item = Result<TradeBlockEvents, SdkError>>
where
    P: Provider,
    S: Fn(Duration) -> SFut + Copy,
    SFut: Future<Output = ()>,
{
    stream::unfold(
        (provider, from_block, false),
        move |(provider, mut block_num, failed)| async move {
            if failed {
                sleep(provider.client().poll_interval()).await;
            }
            loop {
                match poll_block(exchange, &provider, block_num).await {
                    Ok(Some(block)) => {
                        block_num += 1;
                        return Some((Ok(block), (provider, block_num, false)));
                    }
                    Ok(None) => {
                        sleep(provider.client().poll_interval()).await;
                    }
                    Err(err) => return Some((Err(err), (provider, block_num, true))),
                }
            }
        },
    )
}

/// Fetches trades of a single block, `None` if the block is not produced yet.
async fn poll_block<P: Provider>(
    exchange: Address,
    provider: &P,
    block_num: u64,
) -> Result<Option<TradeBlockEvents>, SdkError> {
    // Some nodes answer with empty logs instead of an error for blocks past
    // the tip, so logs are only requested once the head has reached the block
    let head_block_num = provider
        .get_block_number()
        .await
        .map_err(|e| SdkError::read(Operation::Logs, exchange, e))?;
    if head_block_num < block_num {
        return Ok(None);
    }

    let filter = Filter::new()
        .address(exchange)
        .event_signature(vec![TokenBought::SIGNATURE_HASH, TokenSold::SIGNATURE_HASH])
        .from_block(block_num)
        .to_block(block_num);
    let logs = provider
        .get_logs(&filter)
        .await
        .map_err(|e| SdkError::read(Operation::Logs, exchange, e))?;

    let block_ts = logs.first().and_then(|l| l.block_timestamp);
    let mut events = Vec::with_capacity(logs.len());
    for log in &logs {
        let event = TokenExchangeEvents::decode_log(&log.inner)
            .map_err(|e| SdkError::Decode {
                operation: Operation::Logs,
                target: exchange,
                reason: e.to_string(),
            })?
            .data;
        events.push(TradeEvent::new(
            log.transaction_hash.unwrap_or_default(),
            log.transaction_index.unwrap_or_default(),
            log.log_index.unwrap_or_default(),
            event,
        ));
    }
    Ok(Some(TradeBlockEvents::new(
        block_num,
        block_ts.unwrap_or_default(),
        events,
    )))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{U256, address};
    use futures::StreamExt;

    use super::*;
    use crate::testing::MockNode;

    #[tokio::test(start_paused = true)]
    async fn test_stream_trades_per_block() {
        let exchange = address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF");
        let token = address!("0x00000000000000000000000000000000000000aa");
        let trader = address!("0x00000000000000000000000000000000000000bb");
        let node = MockNode::new(11155111);

        let first = node.emit(
            exchange,
            TokenBought {
                buyer: trader,
                token,
                amountSpent: U256::from(1000),
                tokensBought: U256::from(42),
            }
            .encode_log_data(),
        );
        node.mine();
        let third = node.emit(
            exchange,
            TokenSold {
                seller: trader,
                token,
                tokensSold: U256::from(42),
                amountReceived: U256::from(990),
            }
            .encode_log_data(),
        );

        let blocks = trades(exchange, node.provider(), first, tokio::time::sleep)
            .take(3)
            .collect::<Vec<_>>()
            .await;

        let block = blocks[0].as_ref().unwrap();
        assert_eq!(block.block_number(), first);
        assert_eq!(block.events().len(), 1);
        assert!(matches!(
            block.events()[0].event(),
            TokenExchangeEvents::TokenBought(e) if e.buyer == trader && e.amountSpent == U256::from(1000)
        ));

        let block = blocks[1].as_ref().unwrap();
        assert_eq!(block.block_number(), first + 1);
        assert!(block.is_empty());

        let block = blocks[2].as_ref().unwrap();
        assert_eq!(block.block_number(), third);
        assert!(matches!(
            block.events()[0].event(),
            TokenExchangeEvents::TokenSold(e) if e.amountReceived == U256::from(990)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_waits_for_next_block() {
        let exchange = address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF");
        let node = MockNode::new(11155111);
        let next = node.block_number() + 1;

        let producer = {
            let node = node.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                node.mine()
            })
        };

        let mut stream = Box::pin(trades(exchange, node.provider(), next, tokio::time::sleep));
        let block = stream.next().await.unwrap().unwrap();
        assert_eq!(block.block_number(), next);
        assert!(block.is_empty());
        assert_eq!(producer.await.unwrap(), next);
    }

    /// A block mined while the head is being read is still reported with its trades.
    #[tokio::test(start_paused = true)]
    async fn test_stream_block_mined_during_head_read() {
        let exchange = address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF");
        let token = address!("0x00000000000000000000000000000000000000aa");
        let trader = address!("0x00000000000000000000000000000000000000bb");
        let node = MockNode::new(11155111);
        let next = node.block_number() + 1;
        node.delay("eth_blockNumber", Duration::from_secs(1));

        let producer = {
            let node = node.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                node.emit(
                    exchange,
                    TokenBought {
                        buyer: trader,
                        token,
                        amountSpent: U256::from(1000),
                        tokensBought: U256::from(42),
                    }
                    .encode_log_data(),
                )
            })
        };

        let mut stream = Box::pin(trades(exchange, node.provider(), next, tokio::time::sleep));
        let block = stream.next().await.unwrap().unwrap();
        assert_eq!(producer.await.unwrap(), next);
        assert_eq!(block.block_number(), next);
        assert_eq!(block.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_backs_off_after_failed_poll() {
        let exchange = address!("0x2c4145a98611B2Dc6Ecfcd0bcc2A2f841E0916BF");
        let node = MockNode::new(11155111);
        let head = node.block_number();
        node.fail("eth_getLogs", "upstream unavailable");

        let provider = node.provider();
        let interval = provider.client().poll_interval();
        let mut stream = Box::pin(trades(exchange, provider, head, tokio::time::sleep));

        let started = tokio::time::Instant::now();
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.unwrap().is_err());
        assert!(started.elapsed() >= interval);

        node.recover("eth_getLogs");
        let block = stream.next().await.unwrap().unwrap();
        assert_eq!(block.block_number(), head);
        assert!(started.elapsed() >= interval * 2);
    }
}
