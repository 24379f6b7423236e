// Exchange connectivity
pub mod binance;
pub mod dry_run;
#[cfg(test)]
pub(crate) mod mock;

pub use binance::{BinanceClient, BinanceCredentials};
pub use dry_run::DryRunExchange;

use crate::error::ExchangeError;
use crate::models::{Balance, DailyCandle, OrderIntent, OrderResult, OrderSide, TradingPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Request/response contract the decision engine needs from an exchange.
///
/// Every call may fail. Callers do not retry.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Daily candle opening at `utc_day_start` (midnight UTC)
    async fn fetch_daily_candle(
        &self,
        pair: &TradingPair,
        utc_day_start: DateTime<Utc>,
    ) -> Result<DailyCandle, ExchangeError>;

    /// Last traded price
    async fn fetch_current_price(&self, pair: &TradingPair) -> Result<Decimal, ExchangeError>;

    /// Free (not locked in orders) balance of one asset
    async fn fetch_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError>;

    async fn submit_market_buy(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError>;

    async fn submit_market_sell(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError>;

    /// Free balances of both assets of a pair
    async fn fetch_balance(&self, pair: &TradingPair) -> Result<Balance, ExchangeError> {
        let quote_free = self.fetch_free_balance(&pair.quote).await?;
        let base_free = self.fetch_free_balance(&pair.base).await?;
        Ok(Balance {
            quote_free,
            base_free,
        })
    }

    /// Route an intent to the matching market order call
    async fn submit(&self, intent: &OrderIntent) -> Result<OrderResult, ExchangeError> {
        match intent.side {
            OrderSide::Buy => self.submit_market_buy(&intent.pair, intent.quantity).await,
            OrderSide::Sell => self.submit_market_sell(&intent.pair, intent.quantity).await,
        }
    }
}
