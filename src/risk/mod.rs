// Re-entry protection
pub mod cooldown;

pub use cooldown::{EnginePhase, TradingState};
