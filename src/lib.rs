// Core modules
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod risk;
pub mod scheduler;
pub mod strategy;

// Re-export commonly used types
pub use api::Exchange;
pub use error::{EngineError, ExchangeError};
pub use execution::DecisionEngine;
pub use models::*;
pub use strategy::TargetPriceCalculator;
