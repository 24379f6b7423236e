// Daily target price strategies
pub mod breakout;

pub use breakout::RangeBreakout;

use crate::models::DailyCandle;
use rust_decimal::Decimal;

/// The candle carried no data, so no target can be derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("daily candle unavailable")]
pub struct TargetUnavailable;

/// Base trait for daily target price calculators
pub trait TargetPriceCalculator: Send + Sync {
    /// Derive today's buy threshold from yesterday's candle
    fn compute_target(&self, candle: &DailyCandle) -> Result<Decimal, TargetUnavailable>;

    /// Get strategy name
    fn name(&self) -> &str;
}
