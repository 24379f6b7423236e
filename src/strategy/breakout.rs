use super::{TargetPriceCalculator, TargetUnavailable};
use crate::models::DailyCandle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// K-range breakout target
///
/// target = previous close + (previous high - previous low) * k
///
/// A price at or above the target is read as meaningful upward momentum for the
/// day. Inverted or flat candles are not special-cased: the range term simply
/// contributes zero or a negative amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBreakout {
    k: Decimal,
}

impl RangeBreakout {
    pub const DEFAULT_K: Decimal = dec!(0.25);

    pub fn new(k: Decimal) -> Self {
        Self { k }
    }

    pub fn k(&self) -> Decimal {
        self.k
    }
}

impl Default for RangeBreakout {
    fn default() -> Self {
        Self::new(Self::DEFAULT_K)
    }
}

impl TargetPriceCalculator for RangeBreakout {
    fn compute_target(&self, candle: &DailyCandle) -> Result<Decimal, TargetUnavailable> {
        if !candle.has_data() {
            return Err(TargetUnavailable);
        }

        Ok(candle.close + candle.range() * self.k)
    }

    fn name(&self) -> &str {
        "range_breakout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: Decimal, high: Decimal, low: Decimal) -> DailyCandle {
        DailyCandle {
            timestamp: 1_700_006_400_000,
            open: close,
            high,
            low,
            close,
        }
    }

    #[test]
    fn test_reference_target() {
        let strategy = RangeBreakout::default();
        let target = strategy
            .compute_target(&candle(dec!(100), dec!(110), dec!(90)))
            .unwrap();

        // 100 + (110 - 90) * 0.25
        assert_eq!(target, dec!(105));
    }

    #[test]
    fn test_custom_k() {
        let strategy = RangeBreakout::new(dec!(0.5));
        let target = strategy
            .compute_target(&candle(dec!(42000.5), dec!(43000), dec!(41000)))
            .unwrap();

        assert_eq!(target, dec!(43000.5));
    }

    #[test]
    fn test_zero_timestamp_is_unavailable() {
        let strategy = RangeBreakout::default();
        let mut empty = candle(dec!(100), dec!(110), dec!(90));
        empty.timestamp = 0;

        assert_eq!(strategy.compute_target(&empty), Err(TargetUnavailable));
    }

    #[test]
    fn test_flat_candle_targets_close() {
        let strategy = RangeBreakout::default();
        let target = strategy
            .compute_target(&candle(dec!(100), dec!(100), dec!(100)))
            .unwrap();

        assert_eq!(target, dec!(100));
    }

    #[test]
    fn test_inverted_candle_lowers_target() {
        // high < low is not rejected, the range just goes negative
        let strategy = RangeBreakout::default();
        let target = strategy
            .compute_target(&candle(dec!(100), dec!(90), dec!(110)))
            .unwrap();

        assert_eq!(target, dec!(95));
    }

    #[test]
    fn test_deterministic() {
        let strategy = RangeBreakout::default();
        let c = candle(dec!(61234.12), dec!(62500.01), dec!(60111.99));

        let first = strategy.compute_target(&c).unwrap();
        let second = strategy.compute_target(&c).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, c.close + (c.high - c.low) * dec!(0.25));
    }
}
