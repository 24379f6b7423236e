//! In-memory exchange for unit tests.

use super::Exchange;
use crate::error::ExchangeError;
use crate::models::{DailyCandle, OrderIntent, OrderResult, OrderSide, TradingPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockExchange {
    candle: Mutex<Option<DailyCandle>>,
    price: Mutex<Option<Decimal>>,
    balances: Mutex<HashMap<String, Decimal>>,
    reject_orders: Mutex<Option<String>>,
    expire_orders: AtomicBool,
    orders: Mutex<Vec<OrderIntent>>,
    candle_requests: Mutex<Vec<DateTime<Utc>>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_candle(&self, candle: Option<DailyCandle>) {
        *self.candle.lock().unwrap() = candle;
    }

    pub fn set_price(&self, price: Option<Decimal>) {
        *self.price.lock().unwrap() = price;
    }

    pub fn set_balance(&self, asset: &str, amount: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert(asset.to_string(), amount);
    }

    pub fn reject_orders(&self, reason: Option<&str>) {
        *self.reject_orders.lock().unwrap() = reason.map(str::to_string);
    }

    /// Accept orders but answer with nothing executed
    pub fn expire_orders(&self, expire: bool) {
        self.expire_orders.store(expire, Ordering::SeqCst);
    }

    pub fn orders(&self) -> Vec<OrderIntent> {
        self.orders.lock().unwrap().clone()
    }

    pub fn candle_requests(&self) -> Vec<DateTime<Utc>> {
        self.candle_requests.lock().unwrap().clone()
    }

    fn fill(&self, side: OrderSide, pair: &TradingPair, quantity: Decimal) -> Result<OrderResult, ExchangeError> {
        if let Some(msg) = self.reject_orders.lock().unwrap().clone() {
            return Err(ExchangeError::Api { code: -2010, msg });
        }

        let price = (*self.price.lock().unwrap()).unwrap_or(Decimal::ONE);
        let mut orders = self.orders.lock().unwrap();
        orders.push(OrderIntent {
            side,
            pair: pair.clone(),
            quantity,
        });

        let (executed_qty, status) = if self.expire_orders.load(Ordering::SeqCst) {
            (Decimal::ZERO, "EXPIRED")
        } else {
            (quantity, "FILLED")
        };

        Ok(OrderResult {
            order_id: orders.len().to_string(),
            client_order_id: None,
            side,
            executed_qty,
            quote_qty: executed_qty * price,
            status: status.to_string(),
            transact_time: Utc::now(),
        })
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn fetch_daily_candle(
        &self,
        _pair: &TradingPair,
        utc_day_start: DateTime<Utc>,
    ) -> Result<DailyCandle, ExchangeError> {
        self.candle_requests.lock().unwrap().push(utc_day_start);
        let candle = *self.candle.lock().unwrap();
        candle.ok_or_else(|| ExchangeError::NoData("no candle".to_string()))
    }

    async fn fetch_current_price(&self, _pair: &TradingPair) -> Result<Decimal, ExchangeError> {
        let price = *self.price.lock().unwrap();
        price.ok_or_else(|| ExchangeError::NoData("no ticker".to_string()))
    }

    async fn fetch_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn submit_market_buy(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        self.fill(OrderSide::Buy, pair, quantity)
    }

    async fn submit_market_sell(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        self.fill(OrderSide::Sell, pair, quantity)
    }
}
