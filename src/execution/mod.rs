// Trading decisions and order execution
pub mod engine;
pub mod outcome;

pub use engine::{DecisionEngine, EngineSettings};
pub use outcome::{BuyOutcome, DailyCycleReport, LiquidationOutcome, TargetOutcome};
