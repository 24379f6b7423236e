use crate::api::binance::BINANCE_API_BASE;
use crate::execution::EngineSettings;
use crate::models::{PairParseError, TradingPair};
use chrono::NaiveTime;
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "breakoutbot.toml";
const ENV_PREFIX: &str = "BREAKOUT";

/// Startup configuration problems. These are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Pair(#[from] PairParseError),

    #[error("invalid daily time '{0}', expected HH:MM")]
    DailyTime(String),

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: String },

    #[error("{field} is out of range, got {value}")]
    OutOfRange { field: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    pub base_url: String,
    pub recv_window_ms: u64,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    pub pair: String,
    pub k: Decimal,
    pub cooldown_secs: u64,
    pub dust_threshold: Decimal,
    pub min_notional: Decimal,
    pub quantity_step: Decimal,
    pub min_order_qty: Decimal,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub daily_at: String,
    pub poll_interval_secs: u64,
}

/// Everything the bot needs at startup
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub schedule: ScheduleConfig,
}

impl BotConfig {
    /// Load defaults, then the optional config file, then `BREAKOUT__*` env vars.
    ///
    /// Credentials fall back to `BINANCE_API_KEY` / `BINANCE_SECRET`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut config: BotConfig = Self::builder()?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if config.exchange.api_key.is_empty() {
            config.exchange.api_key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
        }
        if config.exchange.api_secret.is_empty() {
            config.exchange.api_secret = std::env::var("BINANCE_SECRET").unwrap_or_default();
        }

        Ok(config)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("exchange.base_url", BINANCE_API_BASE)?
            .set_default("exchange.recv_window_ms", 5_000)?
            .set_default("exchange.requests_per_minute", 600)?
            .set_default("exchange.timeout_secs", 10)?
            .set_default("trading.pair", "BTC/USDT")?
            .set_default("trading.k", "0.25")?
            .set_default("trading.cooldown_secs", 300)?
            .set_default("trading.dust_threshold", "0.0001")?
            .set_default("trading.min_notional", "1")?
            .set_default("trading.quantity_step", "0.0001")?
            .set_default("trading.min_order_qty", "0.0001")?
            .set_default("trading.dry_run", false)?
            .set_default("schedule.daily_at", "00:05")?
            .set_default("schedule.poll_interval_secs", 60)?)
    }

    /// Check everything the engine and scheduler depend on.
    ///
    /// Credentials are only required when orders will really be sent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.trading.dry_run {
            if self.exchange.api_key.trim().is_empty() {
                return Err(ConfigError::MissingCredential("api_key"));
            }
            if self.exchange.api_secret.trim().is_empty() {
                return Err(ConfigError::MissingCredential("api_secret"));
            }
        }

        self.pair()?;
        self.daily_at()?;
        self.cooldown()?;

        if self.trading.quantity_step <= Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                field: "trading.quantity_step",
                value: self.trading.quantity_step.to_string(),
            });
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "schedule.poll_interval_secs",
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    pub fn pair(&self) -> Result<TradingPair, ConfigError> {
        Ok(self.trading.pair.parse()?)
    }

    /// Daily job time of day, UTC
    pub fn daily_at(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.schedule.daily_at.trim(), "%H:%M")
            .map_err(|_| ConfigError::DailyTime(self.schedule.daily_at.clone()))
    }

    /// Post-sale cooldown as a chrono duration
    pub fn cooldown(&self) -> Result<chrono::Duration, ConfigError> {
        i64::try_from(self.trading.cooldown_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| ConfigError::OutOfRange {
                field: "trading.cooldown_secs",
                value: self.trading.cooldown_secs.to_string(),
            })
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        Ok(EngineSettings {
            pair: self.pair()?,
            cooldown: self.cooldown()?,
            dust_threshold: self.trading.dust_threshold,
            min_notional: self.trading.min_notional,
            quantity_step: self.trading.quantity_step,
            min_order_qty: self.trading.min_order_qty,
        })
    }
}
