use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where the engine stands for one trading pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    /// No target computed yet
    Uninitialized,
    /// Target set, buys allowed
    Armed,
    /// Target set, a recent sell blocks buys
    Cooldown,
}

/// Mutable state of the decision engine.
///
/// The target is replaced wholesale by each daily refresh. The cooldown starts at
/// the last successful liquidation; buys do not start one.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingState {
    pub target_buy_price: Option<Decimal>,
    pub last_sell_at: Option<DateTime<Utc>>,
    cooldown: Duration,
}

impl TradingState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            target_buy_price: None,
            last_sell_at: None,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Time left before buys are allowed again, if a cooldown is running
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last_sell = self.last_sell_at?;
        let elapsed = now - last_sell;

        if elapsed < self.cooldown {
            Some(self.cooldown - elapsed)
        } else {
            None
        }
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_remaining(now).is_some()
    }

    pub fn phase(&self, now: DateTime<Utc>) -> EnginePhase {
        match self.target_buy_price {
            None => EnginePhase::Uninitialized,
            Some(_) if self.in_cooldown(now) => EnginePhase::Cooldown,
            Some(_) => EnginePhase::Armed,
        }
    }
}
