use super::Exchange;
use crate::error::ExchangeError;
use crate::models::{DailyCandle, OrderIntent, OrderResult, OrderSide, TradingPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Passes market data and balances through to a real exchange but never places
/// orders. Each order is logged and answered with a synthetic fill at the
/// current ticker price.
///
/// Balances are not simulated, so the underlying account never changes.
pub struct DryRunExchange<E> {
    inner: E,
    next_id: AtomicU64,
    submitted: Mutex<Vec<OrderIntent>>,
}

impl<E: Exchange> DryRunExchange<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            next_id: AtomicU64::new(1),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Orders that would have been sent, oldest first
    pub fn submitted(&self) -> Vec<OrderIntent> {
        self.submitted
            .lock()
            .map(|orders| orders.clone())
            .unwrap_or_default()
    }

    async fn simulate(
        &self,
        side: OrderSide,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        let price = self.inner.fetch_current_price(pair).await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            symbol = %pair.symbol(),
            side = %side,
            quantity = %quantity,
            price = %price,
            "[DRY RUN] market order not sent"
        );

        if let Ok(mut orders) = self.submitted.lock() {
            orders.push(OrderIntent {
                side,
                pair: pair.clone(),
                quantity,
            });
        }

        Ok(OrderResult {
            order_id: format!("dry-run-{}", id),
            client_order_id: None,
            side,
            executed_qty: quantity,
            quote_qty: quantity * price,
            status: "FILLED".to_string(),
            transact_time: Utc::now(),
        })
    }
}

#[async_trait]
impl<E: Exchange> Exchange for DryRunExchange<E> {
    async fn fetch_daily_candle(
        &self,
        pair: &TradingPair,
        utc_day_start: DateTime<Utc>,
    ) -> Result<DailyCandle, ExchangeError> {
        self.inner.fetch_daily_candle(pair, utc_day_start).await
    }

    async fn fetch_current_price(&self, pair: &TradingPair) -> Result<Decimal, ExchangeError> {
        self.inner.fetch_current_price(pair).await
    }

    async fn fetch_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        self.inner.fetch_free_balance(asset).await
    }

    async fn submit_market_buy(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        self.simulate(OrderSide::Buy, pair, quantity).await
    }

    async fn submit_market_sell(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        self.simulate(OrderSide::Sell, pair, quantity).await
    }
}
