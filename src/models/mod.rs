use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A spot trading pair such as `BTC/USDT`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: String,  // Asset being bought and sold
    pub quote: String, // Asset the price is quoted in
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trading pair '{0}', expected BASE/QUOTE")]
pub struct PairParseError(pub String);

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// Exchange symbol without separator (`BTC/USDT` -> `BTCUSDT`)
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| PairParseError(s.to_string()))?;
        let (base, quote) = (base.trim(), quote.trim());

        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return Err(PairParseError(s.to_string()));
        }

        Ok(Self::new(base, quote))
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// One day of OHLC data.
///
/// `timestamp` is the UTC midnight the candle opens at, in milliseconds since the
/// epoch. A zero timestamp marks a candle with no data behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyCandle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl DailyCandle {
    pub fn has_data(&self) -> bool {
        self.timestamp != 0
    }

    /// High minus low. Negative for inverted candles.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }
}

/// Free balances of both sides of a pair, read at decision time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub quote_free: Decimal,
    pub base_free: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire name used by the exchange API
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A market order the engine wants placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: OrderSide,
    pub pair: TradingPair,
    pub quantity: Decimal,
}

impl OrderIntent {
    pub fn buy(pair: TradingPair, quantity: Decimal) -> Self {
        Self {
            side: OrderSide::Buy,
            pair,
            quantity,
        }
    }

    pub fn sell(pair: TradingPair, quantity: Decimal) -> Self {
        Self {
            side: OrderSide::Sell,
            pair,
            quantity,
        }
    }
}

/// Exchange confirmation of a submitted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub side: OrderSide,
    pub executed_qty: Decimal,
    pub quote_qty: Decimal, // Quote currency spent or received
    pub status: String,
    pub transact_time: DateTime<Utc>,
}

impl OrderResult {
    pub fn is_filled(&self) -> bool {
        self.executed_qty > Decimal::ZERO
    }

    /// Volume-weighted fill price, if anything executed
    pub fn average_price(&self) -> Option<Decimal> {
        if self.is_filled() {
            Some(self.quote_qty / self.executed_qty)
        } else {
            None
        }
    }
}
