use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use breakoutbot::api::{BinanceClient, BinanceCredentials, DryRunExchange, Exchange};
use breakoutbot::clock::SystemClock;
use breakoutbot::config::BotConfig;
use breakoutbot::execution::DecisionEngine;
use breakoutbot::scheduler::{Schedule, Scheduler};
use breakoutbot::strategy::RangeBreakout;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "breakoutbot", about = "Daily range breakout trading bot")]
struct Cli {
    /// Path to a TOML config file (default: ./breakoutbot.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log orders instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daily job and the price polling loop until Ctrl+C (default)
    Run,
    /// Refresh the target once, check for a buy once, then exit
    Once,
    /// Print today's target price without trading
    Target,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run);

    let mut config = BotConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.dry_run || matches!(command, Command::Target) {
        config.trading.dry_run = true;
    }
    config.validate().context("Invalid configuration")?;

    let engine = Arc::new(build_engine(&config)?);
    log_configuration(&config);

    match command {
        Command::Run => run(engine, &config).await,
        Command::Once => {
            let pair = &engine.settings().pair;
            match engine.balance().await {
                Ok(balance) => tracing::info!(
                    "💰 Balance: {} {} / {} {}",
                    balance.base_free,
                    pair.base,
                    balance.quote_free,
                    pair.quote
                ),
                Err(e) => tracing::warn!("{}", e),
            }
            let target = engine.refresh_daily_target().await;
            tracing::info!("{}", target);
            let buy = engine.check_buy_opportunity().await;
            tracing::info!("{}", buy);
            Ok(())
        }
        Command::Target => {
            let outcome = engine.refresh_daily_target().await;
            match outcome.target() {
                Some(target) => {
                    println!("{} target buy price: {}", engine.settings().pair, target);
                    Ok(())
                }
                None => anyhow::bail!("{}", outcome),
            }
        }
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("breakoutbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_engine(config: &BotConfig) -> anyhow::Result<DecisionEngine> {
    let client = BinanceClient::with_options(
        BinanceCredentials::new(&config.exchange.api_key, &config.exchange.api_secret),
        &config.exchange.base_url,
        config.exchange.recv_window_ms,
        config.exchange.requests_per_minute,
        Duration::from_secs(config.exchange.timeout_secs),
    )
    .context("Failed to build Binance client")?;

    let exchange: Arc<dyn Exchange> = if config.trading.dry_run {
        Arc::new(DryRunExchange::new(client))
    } else {
        Arc::new(client)
    };

    Ok(DecisionEngine::new(
        exchange,
        Arc::new(RangeBreakout::new(config.trading.k)),
        Arc::new(SystemClock),
        config.engine_settings()?,
    ))
}

fn log_configuration(config: &BotConfig) {
    tracing::info!("📊 Configuration:");
    tracing::info!("  Pair: {}", config.trading.pair);
    tracing::info!("  K: {}", config.trading.k);
    tracing::info!("  Cooldown: {}s", config.trading.cooldown_secs);
    tracing::info!("  Daily job: {} UTC", config.schedule.daily_at);
    tracing::info!("  Poll interval: {}s", config.schedule.poll_interval_secs);
    if config.trading.dry_run {
        tracing::info!("  Mode: DRY RUN (orders are logged, not sent)");
    }
}

async fn run(engine: Arc<DecisionEngine>, config: &BotConfig) -> anyhow::Result<()> {
    tracing::info!("🚀 breakoutbot starting");

    let schedule = Schedule {
        daily_at: config.daily_at()?,
        poll_interval: Duration::from_secs(config.schedule.poll_interval_secs),
    };
    let (daily_task, poll_task) = Scheduler::new(engine, schedule).spawn();

    tracing::info!("Press Ctrl+C to stop...");

    // Wait for Ctrl+C or task failure
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
        }
        result = daily_task => {
            tracing::error!("Daily loop exited: {:?}", result);
        }
        result = poll_task => {
            tracing::error!("Poll loop exited: {:?}", result);
        }
    }

    tracing::info!("👋 breakoutbot stopped");
    Ok(())
}
