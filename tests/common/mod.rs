#![allow(dead_code)]

use async_trait::async_trait;
use breakoutbot::api::Exchange;
use breakoutbot::error::ExchangeError;
use breakoutbot::models::{DailyCandle, OrderIntent, OrderResult, OrderSide, TradingPair};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Exchange double driven by a script of prices.
///
/// With `settle` enabled, fills move balances the way a real account would.
#[derive(Default)]
pub struct ScriptedExchange {
    candle: Mutex<Option<DailyCandle>>,
    prices: Mutex<VecDeque<Decimal>>,
    last_price: Mutex<Option<Decimal>>,
    balances: Mutex<HashMap<String, Decimal>>,
    settle: bool,
    fail_sells: AtomicBool,
    orders: Mutex<Vec<OrderIntent>>,
    price_gate: Mutex<Option<Arc<Notify>>>,
    pub price_entered: Notify,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settling() -> Self {
        Self {
            settle: true,
            ..Self::default()
        }
    }

    pub fn set_candle(&self, candle: Option<DailyCandle>) {
        *self.candle.lock().unwrap() = candle;
    }

    /// Prices returned by successive ticker calls; the last one repeats
    pub fn script_prices(&self, prices: &[Decimal]) {
        self.prices.lock().unwrap().extend(prices.iter().copied());
    }

    pub fn set_price(&self, price: Decimal) {
        *self.last_price.lock().unwrap() = Some(price);
    }

    pub fn set_balance(&self, asset: &str, amount: Decimal) {
        self.balances.lock().unwrap().insert(asset.to_string(), amount);
    }

    pub fn balance(&self, asset: &str) -> Decimal {
        self.balances
            .lock()
            .unwrap()
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn fail_sells(&self, fail: bool) {
        self.fail_sells.store(fail, Ordering::SeqCst);
    }

    /// Make the next ticker call wait until `gate` is notified
    pub fn gate_next_price(&self, gate: Arc<Notify>) {
        *self.price_gate.lock().unwrap() = Some(gate);
    }

    pub fn orders(&self) -> Vec<OrderIntent> {
        self.orders.lock().unwrap().clone()
    }

    fn current_price(&self) -> Option<Decimal> {
        *self.last_price.lock().unwrap()
    }

    fn fill(&self, side: OrderSide, pair: &TradingPair, quantity: Decimal) -> Result<OrderResult, ExchangeError> {
        if side == OrderSide::Sell && self.fail_sells.load(Ordering::SeqCst) {
            return Err(ExchangeError::Api {
                code: -1013,
                msg: "Filter failure: LOT_SIZE".to_string(),
            });
        }

        let price = self.current_price().unwrap_or(Decimal::ONE);
        let notional = quantity * price;

        if self.settle {
            let mut balances = self.balances.lock().unwrap();
            let (base_delta, quote_delta) = match side {
                OrderSide::Buy => (quantity, -notional),
                OrderSide::Sell => (-quantity, notional),
            };
            *balances.entry(pair.base.clone()).or_insert(Decimal::ZERO) += base_delta;
            *balances.entry(pair.quote.clone()).or_insert(Decimal::ZERO) += quote_delta;
        }

        let mut orders = self.orders.lock().unwrap();
        orders.push(OrderIntent {
            side,
            pair: pair.clone(),
            quantity,
        });

        Ok(OrderResult {
            order_id: orders.len().to_string(),
            client_order_id: None,
            side,
            executed_qty: quantity,
            quote_qty: notional,
            status: "FILLED".to_string(),
            transact_time: Utc::now(),
        })
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn fetch_daily_candle(
        &self,
        _pair: &TradingPair,
        _utc_day_start: DateTime<Utc>,
    ) -> Result<DailyCandle, ExchangeError> {
        let candle = *self.candle.lock().unwrap();
        candle.ok_or_else(|| ExchangeError::NoData("no kline".to_string()))
    }

    async fn fetch_current_price(&self, _pair: &TradingPair) -> Result<Decimal, ExchangeError> {
        let gate = self.price_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            self.price_entered.notify_one();
            gate.notified().await;
        }

        let next = self.prices.lock().unwrap().pop_front();
        if let Some(price) = next {
            self.set_price(price);
        }

        self.current_price()
            .ok_or_else(|| ExchangeError::NoData("no ticker".to_string()))
    }

    async fn fetch_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.balance(asset))
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

pub fn btc_usdt() -> TradingPair {
    TradingPair::new("BTC", "USDT")
}

/// 00:05 UTC, when the daily job normally runs
pub fn day_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 2, 0, 5, 0).unwrap()
}

pub fn candle(close: Decimal, high: Decimal, low: Decimal) -> DailyCandle {
    DailyCandle {
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap().timestamp_millis(),
        open: close,
        high,
        low,
        close,
    }
}
