use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::execution::DecisionEngine;

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Callbacks driven by the scheduler
#[async_trait]
pub trait TickHandler: Send + Sync {
    /// Once per day at the configured UTC time
    async fn on_daily_tick(&self);

    /// Once per polling interval
    async fn on_poll_tick(&self);
}

#[async_trait]
impl TickHandler for DecisionEngine {
    async fn on_daily_tick(&self) {
        self.run_daily_cycle().await;
    }

    async fn on_poll_tick(&self) {
        self.check_buy_opportunity().await;
    }
}

/// Timing for the two loops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub daily_at: NaiveTime,     // UTC
    pub poll_interval: Duration, // Aligned to wall-clock multiples
}

/// Runs the daily loop and the poll loop as independent tasks.
///
/// Ticks of one loop never overlap each other, but a daily tick may fire while a
/// poll tick is still in flight; the handler is expected to cope with that.
pub struct Scheduler<H> {
    handler: Arc<H>,
    schedule: Schedule,
}

impl<H: TickHandler + 'static> Scheduler<H> {
    pub fn new(handler: Arc<H>, schedule: Schedule) -> Self {
        Self { handler, schedule }
    }

    /// Spawn both loops. They run until the handles are aborted.
    pub fn spawn(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        let daily = {
            let handler = self.handler.clone();
            let daily_at = self.schedule.daily_at;
            tokio::spawn(async move { daily_loop(handler, daily_at).await })
        };

        let poll = {
            let handler = self.handler.clone();
            let poll_interval = self.schedule.poll_interval;
            tokio::spawn(async move { poll_loop(handler, poll_interval).await })
        };

        (daily, poll)
    }
}

async fn daily_loop<H: TickHandler>(handler: Arc<H>, daily_at: NaiveTime) {
    let delay = until_next_daily(Utc::now(), daily_at);
    tracing::info!(
        "Daily job scheduled at {} UTC, first run in {}s",
        daily_at.format("%H:%M"),
        delay.as_secs()
    );

    let mut ticker = interval_at(Instant::now() + delay, ONE_DAY);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        tracing::info!("📅 [DAILY] Tick at {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        handler.on_daily_tick().await;
    }
}

async fn poll_loop<H: TickHandler>(handler: Arc<H>, poll_interval: Duration) {
    let delay = until_next_boundary(Utc::now(), poll_interval);
    tracing::info!(
        "Price check every {}s, first check in {}s",
        poll_interval.as_secs(),
        delay.as_secs()
    );

    let mut ticker = interval_at(Instant::now() + delay, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        tracing::debug!("💹 [POLL] Tick at {}", Utc::now().format("%H:%M:%S"));
        handler.on_poll_tick().await;
    }
}

/// Time from `now` until the next occurrence of `daily_at` (UTC).
///
/// Returns zero when `now` is exactly at the scheduled time.
pub fn until_next_daily(now: DateTime<Utc>, daily_at: NaiveTime) -> Duration {
    let today = now.date_naive().and_time(daily_at).and_utc();
    let next = if today >= now {
        today
    } else {
        today + ChronoDuration::days(1)
    };

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Time from `now` until the next wall-clock multiple of `interval`
/// (XX:00, XX:05, ... for five minutes).
pub fn until_next_boundary(now: DateTime<Utc>, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis() as i64;
    if interval_ms == 0 {
        return Duration::ZERO;
    }

    let rem = now.timestamp_millis().rem_euclid(interval_ms);
    if rem == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis((interval_ms - rem) as u64)
    }
}
