use crate::error::EngineError;
use crate::models::{DailyCandle, OrderResult};
use chrono::Duration;
use rust_decimal::Decimal;
use std::fmt;

/// Result of a daily target refresh
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOutcome {
    Updated {
        previous: Option<Decimal>,
        target: Decimal,
        candle: DailyCandle,
    },
    /// Previous target (if any) kept
    Failed(EngineError),
}

/// Result of the daily liquidation
#[derive(Debug, Clone, PartialEq)]
pub enum LiquidationOutcome {
    /// Free base balance at or below the dust threshold
    NothingToSell { base_free: Decimal },
    Sold {
        quantity: Decimal,
        order: OrderResult,
    },
    Failed(EngineError),
}

/// Result of one buy check. Every skip reason is its own variant.
#[derive(Debug, Clone, PartialEq)]
pub enum BuyOutcome {
    /// No target computed yet
    NotReady,
    BelowTarget {
        price: Decimal,
        target: Decimal,
    },
    CoolingDown {
        price: Decimal,
        target: Decimal,
        remaining: Duration,
    },
    InsufficientBalance {
        quote_free: Decimal,
        min_notional: Decimal,
    },
    QuantityBelowMinimum {
        quantity: Decimal,
        min_order_qty: Decimal,
    },
    Bought {
        price: Decimal,
        quantity: Decimal,
        order: OrderResult,
    },
    Failed(EngineError),
}

/// Both halves of the daily job
#[derive(Debug, Clone, PartialEq)]
pub struct DailyCycleReport {
    pub liquidation: LiquidationOutcome,
    pub target: TargetOutcome,
}

impl TargetOutcome {
    pub fn target(&self) -> Option<Decimal> {
        match self {
            TargetOutcome::Updated { target, .. } => Some(*target),
            TargetOutcome::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TargetOutcome::Failed(_))
    }
}

impl LiquidationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, LiquidationOutcome::Failed(_))
    }
}

impl BuyOutcome {
    pub fn is_buy(&self) -> bool {
        matches!(self, BuyOutcome::Bought { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BuyOutcome::Failed(_))
    }

    /// Short machine-friendly label for logs
    pub fn label(&self) -> &'static str {
        match self {
            BuyOutcome::NotReady => "not_ready",
            BuyOutcome::BelowTarget { .. } => "below_target",
            BuyOutcome::CoolingDown { .. } => "cooling_down",
            BuyOutcome::InsufficientBalance { .. } => "insufficient_balance",
            BuyOutcome::QuantityBelowMinimum { .. } => "quantity_below_minimum",
            BuyOutcome::Bought { .. } => "bought",
            BuyOutcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOutcome::Updated {
                previous: Some(previous),
                target,
                ..
            } => write!(f, "target updated {} -> {}", previous, target),
            TargetOutcome::Updated { target, .. } => write!(f, "target set to {}", target),
            TargetOutcome::Failed(e) => write!(f, "target refresh failed: {}", e),
        }
    }
}

impl fmt::Display for LiquidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidationOutcome::NothingToSell { base_free } => {
                write!(f, "nothing to sell ({} free)", base_free)
            }
            LiquidationOutcome::Sold { quantity, order } => match order.average_price() {
                Some(price) => write!(f, "sold {} at {}", quantity, price),
                None => write!(f, "sold {}", quantity),
            },
            LiquidationOutcome::Failed(e) => write!(f, "liquidation failed: {}", e),
        }
    }
}

impl fmt::Display for BuyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuyOutcome::NotReady => write!(f, "target not set, skipping"),
            BuyOutcome::BelowTarget { price, target } => {
                write!(f, "price {} below target {}", price, target)
            }
            BuyOutcome::CoolingDown {
                price,
                target,
                remaining,
            } => write!(
                f,
                "price {} reached target {} but cooling down for {}s",
                price,
                target,
                remaining.num_seconds()
            ),
            BuyOutcome::InsufficientBalance {
                quote_free,
                min_notional,
            } => write!(
                f,
                "quote balance {} not above minimum notional {}",
                quote_free, min_notional
            ),
            BuyOutcome::QuantityBelowMinimum {
                quantity,
                min_order_qty,
            } => write!(
                f,
                "quantity {} not above minimum order size {}",
                quantity, min_order_qty
            ),
            BuyOutcome::Bought {
                price, quantity, ..
            } => write!(f, "bought {} at {}", quantity, price),
            BuyOutcome::Failed(e) => write!(f, "buy check failed: {}", e),
        }
    }
}

impl fmt::Display for DailyCycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; {}", self.liquidation, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_outcome_labels_are_distinct() {
        let outcomes = [
            BuyOutcome::NotReady,
            BuyOutcome::BelowTarget {
                price: dec!(1),
                target: dec!(2),
            },
            BuyOutcome::CoolingDown {
                price: dec!(2),
                target: dec!(1),
                remaining: Duration::seconds(30),
            },
            BuyOutcome::InsufficientBalance {
                quote_free: dec!(0.5),
                min_notional: dec!(1),
            },
            BuyOutcome::QuantityBelowMinimum {
                quantity: dec!(0),
                min_order_qty: dec!(0.0001),
            },
            BuyOutcome::Failed(EngineError::unavailable("ticker", "timeout")),
        ];

        let mut labels: Vec<_> = outcomes.iter().map(|o| o.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), outcomes.len());
        assert!(outcomes.iter().all(|o| !o.is_buy()));
    }

    #[test]
    fn test_display_messages() {
        let outcome = BuyOutcome::CoolingDown {
            price: dec!(106),
            target: dec!(105),
            remaining: Duration::seconds(90),
        };
        assert_eq!(
            outcome.to_string(),
            "price 106 reached target 105 but cooling down for 90s"
        );

        let outcome = TargetOutcome::Failed(EngineError::unavailable("daily candle", "no data"));
        assert_eq!(
            outcome.to_string(),
            "target refresh failed: daily candle unavailable: no data"
        );
        assert!(outcome.is_failure());
        assert_eq!(outcome.target(), None);
    }

    #[test]
    fn test_sold_display_uses_fill_price() {
        let outcome = LiquidationOutcome::Sold {
            quantity: dec!(2),
            order: OrderResult {
                order_id: "7".to_string(),
                client_order_id: None,
                side: OrderSide::Sell,
                executed_qty: dec!(2),
                quote_qty: dec!(220),
                status: "FILLED".to_string(),
                transact_time: chrono::Utc::now(),
            },
        };

        assert_eq!(outcome.to_string(), "sold 2 at 110");
    }
}
