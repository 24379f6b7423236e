//! Error types shared across the bot.

use crate::models::OrderSide;
use thiserror::Error;

/// Failure talking to an exchange
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("unexpected HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no data: {0}")]
    NoData(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Why a single engine operation gave up.
///
/// Both variants are recoverable: the operation aborts for this tick only and the
/// trading state is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{what} unavailable: {reason}")]
    DataUnavailable { what: &'static str, reason: String },

    #[error("{side} order rejected: {reason}")]
    OrderRejected { side: OrderSide, reason: String },
}

impl EngineError {
    pub fn unavailable(what: &'static str, err: impl std::fmt::Display) -> Self {
        Self::DataUnavailable {
            what,
            reason: err.to_string(),
        }
    }

    pub fn rejected(side: OrderSide, err: impl std::fmt::Display) -> Self {
        Self::OrderRejected {
            side,
            reason: err.to_string(),
        }
    }
}
