//! Command execution over the SDK facades.

use std::{pin::pin, sync::Arc};

use alloy::{primitives::Address, providers::Provider};
use bonding_sdk::{
    abi::exchange::TokenExchange::TokenExchangeEvents,
    contract::{Erc20Token, TokenExchange, TokenFactory},
    num::Converter,
    session::SessionManager,
    stream,
    types::{TradeOp, checksum, parse_address, parse_amount},
};
use futures::StreamExt;
use itertools::Itertools;
use tracing::{info, warn};

use crate::{
    config::{Command, EnvConfig},
    error::{Error, Result},
};

/// Created tokens use 18 decimals.
const TOKEN_DECIMALS: u8 = 18;

/// Initialized exchange and factory facades sharing one session.
#[derive(Debug)]
pub struct App {
    manager: Arc<SessionManager>,
    exchange: TokenExchange,
    factory: TokenFactory,
}

impl App {
    pub async fn try_new(config: &EnvConfig) -> Result<Self> {
        let chain = config.chain()?;
        let settings = config.settings()?;
        let connector = config.connector(&chain)?;
        info!(
            network = chain.name(),
            chain_id = chain.chain_id(),
            exchange = %chain.exchange(),
            factory = %chain.factory(),
            signing = connector.has_agent(),
            "Initializing bonding curve CLI"
        );
        let manager = Arc::new(SessionManager::new(chain, connector, settings));
        let exchange = TokenExchange::new(manager.clone());
        let factory = TokenFactory::new(manager.clone());
        futures::try_join!(exchange.initialize(), factory.initialize())?;
        Ok(Self {
            manager,
            exchange,
            factory,
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Quote {
                token,
                amount,
                sell,
            } => self.quote(&token, &amount, TradeOp::from(!sell)).await,
            Command::Buy { token, amount } => self.trade(TradeOp::Buy, &token, &amount).await,
            Command::Sell { token, amount } => self.trade(TradeOp::Sell, &token, &amount).await,
            Command::Allowance { token, owner } => self.allowance(&token, owner.as_deref()).await,
            Command::Approve { token, amount } => self.approve(&token, &amount).await,
            Command::CreateToken {
                name,
                symbol,
                supply,
                reserve_weight,
                slope,
            } => {
                self.create_token(name, symbol, &supply, &reserve_weight, &slope)
                    .await
            }
            Command::TokenConfig { token } => {
                let config = self.factory.get_token_config(parse_address(&token)?).await?;
                println!("{config}");
                Ok(())
            }
            Command::Tokens { creator } => self.tokens(creator.as_deref()).await,
            Command::Balance { token, account } => {
                self.balance(token.as_deref(), account.as_deref()).await
            }
            Command::Watch { from_block } => self.watch(from_block).await,
        }
    }

    fn account_or(&self, value: Option<&str>) -> Result<Address> {
        match value {
            Some(value) => Ok(parse_address(value)?),
            None => self.manager.account().ok_or(Error::NoAccount),
        }
    }

    /// Assets spent and received by a trade of `token`.
    fn assets(&self, op: TradeOp, token: Address) -> (Address, Address) {
        match op {
            TradeOp::Buy => (self.exchange.reserve_token(), token),
            TradeOp::Sell => (token, self.exchange.reserve_token()),
        }
    }

    async fn converter(&self, token: Address) -> Result<Converter> {
        let erc20 = Erc20Token::new(self.manager.clone(), token);
        erc20.initialize().await?;
        Ok(Converter::new(erc20.decimals().await?))
    }

    async fn quote(&self, token: &str, amount: &str, op: TradeOp) -> Result<()> {
        let token = parse_address(token)?;
        let (spent, received) = self.assets(op, token);
        let (spent_units, received_units) =
            futures::try_join!(self.converter(spent), self.converter(received))?;
        let amount = spent_units.parse(amount)?;
        let quote = self.exchange.quote(token, amount, op).await?;
        println!("{}", received_units.format(quote)?);
        Ok(())
    }

    async fn trade(&self, op: TradeOp, token: &str, amount: &str) -> Result<()> {
        let token = parse_address(token)?;
        let (spent, _) = self.assets(op, token);
        let amount = self.converter(spent).await?.parse(amount)?;
        let receipt = match op {
            TradeOp::Buy => self.exchange.buy_with_approval(token, amount).await?,
            TradeOp::Sell => self.exchange.sell_with_approval(token, amount).await?,
        };
        if let Some(approval) = receipt.approval {
            println!("approval: {approval}");
        }
        println!("trade: {}", receipt.trade);
        Ok(())
    }

    async fn allowance(&self, token: &str, owner: Option<&str>) -> Result<()> {
        let token = parse_address(token)?;
        let owner = self.account_or(owner)?;
        let allowance = self
            .exchange
            .check_allowance(owner, self.exchange.address(), token)
            .await?;
        println!("{}", self.converter(token).await?.format(allowance)?);
        Ok(())
    }

    async fn approve(&self, token: &str, amount: &str) -> Result<()> {
        let token = parse_address(token)?;
        let amount = self.converter(token).await?.parse(amount)?;
        let tx = self.exchange.approve(token, amount).await?;
        println!("approval: {tx}");
        Ok(())
    }

    async fn create_token(
        &self,
        name: String,
        symbol: String,
        supply: &str,
        reserve_weight: &str,
        slope: &str,
    ) -> Result<()> {
        let params = self.factory.new_token(
            name,
            symbol,
            Converter::new(TOKEN_DECIMALS).parse(supply)?,
            parse_amount(reserve_weight)?,
            parse_amount(slope)?,
        )?;
        let (tx, token) = self.factory.create_token_and_wait(params).await?;
        println!("token: {}", checksum(&token));
        println!("transaction: {tx}");
        Ok(())
    }

    async fn tokens(&self, creator: Option<&str>) -> Result<()> {
        let tokens = match creator {
            Some(creator) => {
                self.factory
                    .tokens_created_by(parse_address(creator)?)
                    .await?
            }
            None => self.factory.list_all_tokens().await?,
        };
        if !tokens.is_empty() {
            println!("{}", tokens.iter().map(checksum).join("\n"));
        }
        Ok(())
    }

    async fn balance(&self, token: Option<&str>, account: Option<&str>) -> Result<()> {
        let token = token
            .map(parse_address)
            .transpose()?
            .unwrap_or(self.exchange.reserve_token());
        let account = self.account_or(account)?;
        let (balance, symbol, units) = futures::try_join!(
            async { Ok::<_, Error>(self.exchange.token_balance(token, account).await?) },
            async { Ok(self.exchange.token_symbol(token).await?) },
            self.converter(token),
        )?;
        println!("{} {symbol}", units.format(balance)?);
        Ok(())
    }

    async fn watch(&self, from_block: Option<u64>) -> Result<()> {
        let provider = self.manager.ensure_ready().await?.read_only().clone();
        let from_block = match from_block {
            Some(block) => block,
            None => provider.get_block_number().await?,
        };
        info!(exchange = %self.exchange.address(), from_block, "Following trades");

        let mut trades = pin!(stream::trades(
            self.exchange.address(),
            provider,
            from_block,
            tokio::time::sleep,
        ));
        while let Some(block) = trades.next().await {
            let block = match block {
                Ok(block) => block,
                Err(err) => {
                    warn!(%err, "Failed to poll trades, retrying after poll interval");
                    continue;
                }
            };
            for trade in block.events() {
                match trade.event() {
                    TokenExchangeEvents::TokenBought(e) => info!(
                        block = block.block_number(),
                        tx = %trade.tx_hash(),
                        buyer = %e.buyer,
                        token = %e.token,
                        spent = %e.amountSpent,
                        bought = %e.tokensBought,
                        "Token bought"
                    ),
                    TokenExchangeEvents::TokenSold(e) => info!(
                        block = block.block_number(),
                        tx = %trade.tx_hash(),
                        seller = %e.seller,
                        token = %e.token,
                        sold = %e.tokensSold,
                        received = %e.amountReceived,
                        "Token sold"
                    ),
                }
            }
        }
        Err(Error::StreamClosed)
    }
}
