use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

use super::outcome::{BuyOutcome, DailyCycleReport, LiquidationOutcome, TargetOutcome};
use crate::api::Exchange;
use crate::clock::Clock;
use crate::error::EngineError;
use crate::models::{Balance, OrderIntent, OrderSide, TradingPair};
use crate::risk::{EnginePhase, TradingState};
use crate::strategy::TargetPriceCalculator;

/// Thresholds and timing for one trading pair
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub pair: TradingPair,
    pub cooldown: Duration,
    pub dust_threshold: Decimal, // Base balances at or below this are not sold
    pub min_notional: Decimal,   // Quote balance must exceed this to buy
    pub quantity_step: Decimal,  // Buy quantities are floored to this increment
    pub min_order_qty: Decimal,  // Floored quantity must exceed this
}

impl EngineSettings {
    pub fn new(pair: TradingPair) -> Self {
        Self {
            pair,
            cooldown: Duration::minutes(5),
            dust_threshold: dec!(0.0001),
            min_notional: dec!(1),
            quantity_step: dec!(0.0001),
            min_order_qty: dec!(0.0001),
        }
    }
}

/// Daily breakout decision engine for a single pair.
///
/// Each operation holds the state lock from start to finish, so overlapping
/// scheduler callbacks are serialized and a buy check never sees a target or
/// cooldown that changes halfway through. Exchange failures abort the current
/// operation and leave the state untouched.
pub struct DecisionEngine {
    exchange: Arc<dyn Exchange>,
    calculator: Arc<dyn TargetPriceCalculator>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    state: Mutex<TradingState>,
}

impl DecisionEngine {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        calculator: Arc<dyn TargetPriceCalculator>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let state = TradingState::new(settings.cooldown);
        Self {
            exchange,
            calculator,
            clock,
            settings,
            state: Mutex::new(state),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> TradingState {
        self.state.lock().await.clone()
    }

    /// Free balances of both sides of the pair
    pub async fn balance(&self) -> Result<Balance, EngineError> {
        self.exchange
            .fetch_balance(&self.settings.pair)
            .await
            .map_err(|e| EngineError::unavailable("balance", e))
    }

    pub async fn phase(&self) -> EnginePhase {
        let now = self.clock.now();
        self.state.lock().await.phase(now)
    }

    /// Daily job: sell whatever is held, then recompute the target.
    ///
    /// The target is recomputed even when the sale fails.
    pub async fn run_daily_cycle(&self) -> DailyCycleReport {
        let mut state = self.state.lock().await;

        let liquidation = self.liquidate(&mut state).await;
        let target = self.refresh_target(&mut state).await;

        let report = DailyCycleReport {
            liquidation,
            target,
        };
        tracing::info!(pair = %self.settings.pair, "Daily cycle finished: {}", report);
        report
    }

    /// Recompute today's target from yesterday's candle
    pub async fn refresh_daily_target(&self) -> TargetOutcome {
        let mut state = self.state.lock().await;
        self.refresh_target(&mut state).await
    }

    /// Sell the whole free base balance if it is above dust
    pub async fn liquidate_position(&self) -> LiquidationOutcome {
        let mut state = self.state.lock().await;
        self.liquidate(&mut state).await
    }

    /// Buy with the free quote balance if price has broken the target
    pub async fn check_buy_opportunity(&self) -> BuyOutcome {
        let state = self.state.lock().await;
        let outcome = self.check_buy(&state).await;

        match &outcome {
            BuyOutcome::Bought { .. } => {
                tracing::info!(pair = %self.settings.pair, outcome = outcome.label(), "{}", outcome)
            }
            BuyOutcome::Failed(_) => {
                tracing::warn!(pair = %self.settings.pair, outcome = outcome.label(), "{}", outcome)
            }
            _ => tracing::debug!(pair = %self.settings.pair, outcome = outcome.label(), "{}", outcome),
        }

        outcome
    }

    async fn refresh_target(&self, state: &mut TradingState) -> TargetOutcome {
        let pair = &self.settings.pair;
        let day_start = previous_utc_day_start(self.clock.now());

        let candle = match self.exchange.fetch_daily_candle(pair, day_start).await {
            Ok(candle) => candle,
            Err(e) => {
                let err = EngineError::unavailable("daily candle", e);
                tracing::warn!(pair = %pair, day = %day_start.format("%Y-%m-%d"), "{}", err);
                return TargetOutcome::Failed(err);
            }
        };

        let target = match self.calculator.compute_target(&candle) {
            Ok(target) => target,
            Err(e) => {
                let err = EngineError::unavailable("daily candle", e);
                tracing::warn!(pair = %pair, day = %day_start.format("%Y-%m-%d"), "{}", err);
                return TargetOutcome::Failed(err);
            }
        };

        let previous = state.target_buy_price.replace(target);

        tracing::info!(
            pair = %pair,
            strategy = self.calculator.name(),
            high = %candle.high,
            low = %candle.low,
            close = %candle.close,
            target = %target,
            "Target buy price set for today"
        );

        TargetOutcome::Updated {
            previous,
            target,
            candle,
        }
    }

    async fn liquidate(&self, state: &mut TradingState) -> LiquidationOutcome {
        let pair = &self.settings.pair;

        let base_free = match self.exchange.fetch_free_balance(&pair.base).await {
            Ok(amount) => amount,
            Err(e) => {
                let err = EngineError::unavailable("base balance", e);
                tracing::warn!(pair = %pair, "{}", err);
                return LiquidationOutcome::Failed(err);
            }
        };

        // Fees charged in the base asset leave balances off the lot step
        let quantity = floor_to_step(base_free, self.settings.quantity_step);
        if quantity <= self.settings.dust_threshold {
            tracing::info!(pair = %pair, base_free = %base_free, "No {} available to sell", pair.base);
            return LiquidationOutcome::NothingToSell { base_free };
        }

        tracing::info!(pair = %pair, base_free = %base_free, quantity = %quantity, "Selling {} {}", quantity, pair.base);

        let intent = OrderIntent::sell(pair.clone(), quantity);
        match self.exchange.submit(&intent).await {
            Ok(order) if order.is_filled() => {
                state.last_sell_at = Some(self.clock.now());
                let outcome = LiquidationOutcome::Sold { quantity, order };
                tracing::info!(pair = %pair, "{}", outcome);
                outcome
            }
            Ok(order) => {
                let err = EngineError::rejected(
                    OrderSide::Sell,
                    format!("order {} not filled (status {})", order.order_id, order.status),
                );
                tracing::warn!(pair = %pair, "{}", err);
                LiquidationOutcome::Failed(err)
            }
            Err(e) => {
                let err = EngineError::rejected(OrderSide::Sell, e);
                tracing::warn!(pair = %pair, "{}", err);
                LiquidationOutcome::Failed(err)
            }
        }
    }

    async fn check_buy(&self, state: &TradingState) -> BuyOutcome {
        let pair = &self.settings.pair;
        let now = self.clock.now();

        let Some(target) = state.target_buy_price else {
            return BuyOutcome::NotReady;
        };

        let price = match self.exchange.fetch_current_price(pair).await {
            Ok(price) if price > Decimal::ZERO => price,
            Ok(price) => {
                return BuyOutcome::Failed(EngineError::unavailable(
                    "ticker",
                    format!("non-positive price {}", price),
                ))
            }
            Err(e) => return BuyOutcome::Failed(EngineError::unavailable("ticker", e)),
        };

        if price < target {
            return BuyOutcome::BelowTarget { price, target };
        }

        if let Some(remaining) = state.cooldown_remaining(now) {
            return BuyOutcome::CoolingDown {
                price,
                target,
                remaining,
            };
        }

        let quote_free = match self.exchange.fetch_free_balance(&pair.quote).await {
            Ok(amount) => amount,
            Err(e) => return BuyOutcome::Failed(EngineError::unavailable("quote balance", e)),
        };

        if quote_free <= self.settings.min_notional {
            return BuyOutcome::InsufficientBalance {
                quote_free,
                min_notional: self.settings.min_notional,
            };
        }

        let quantity = buy_quantity(quote_free, price, self.settings.quantity_step);
        if quantity <= self.settings.min_order_qty {
            return BuyOutcome::QuantityBelowMinimum {
                quantity,
                min_order_qty: self.settings.min_order_qty,
            };
        }

        let intent = OrderIntent::buy(pair.clone(), quantity);
        match self.exchange.submit(&intent).await {
            Ok(order) if order.is_filled() => BuyOutcome::Bought {
                price,
                quantity,
                order,
            },
            Ok(order) => BuyOutcome::Failed(EngineError::rejected(
                OrderSide::Buy,
                format!("order {} not filled (status {})", order.order_id, order.status),
            )),
            Err(e) => BuyOutcome::Failed(EngineError::rejected(OrderSide::Buy, e)),
        }
    }
}

/// Midnight UTC at the start of the day before `now`
pub fn previous_utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    today - Duration::days(1)
}

/// `quote / price` floored to a multiple of `step`
///
/// An overflowing division yields zero so the minimum order check rejects it.
pub fn buy_quantity(quote: Decimal, price: Decimal, step: Decimal) -> Decimal {
    match quote.checked_div(price) {
        Some(raw) => floor_to_step(raw, step),
        None => Decimal::ZERO,
    }
}

/// `quantity` rounded down to a multiple of `step`. A non-positive step
/// leaves it unrounded.
pub fn floor_to_step(quantity: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return quantity;
    }

    match quantity.checked_div(step) {
        Some(steps) => steps.floor() * step,
        None => Decimal::ZERO,
    }
}
