use super::Exchange;
use crate::error::ExchangeError;
use crate::models::{DailyCandle, OrderResult, OrderSide, TradingPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// Binance Spot REST API
// Docs: https://developers.binance.com/docs/binance-spot-api-docs/rest-api
pub const BINANCE_API_BASE: &str = "https://api.binance.com";
const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;
const DEFAULT_RATE_LIMIT_RPM: u32 = 600;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

type HmacSha256 = Hmac<Sha256>;

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// API key pair for signed endpoints
#[derive(Clone)]
pub struct BinanceCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl BinanceCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl std::fmt::Debug for BinanceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Binance spot client
///
/// Cloneable; clones share the HTTP connection pool and the rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: BinanceCredentials,
    recv_window_ms: u64,
    rate_limiter: Arc<BinanceRateLimiter>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: Decimal,
    #[allow(dead_code)]
    locked: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    client_order_id: String,
    transact_time: i64,
    executed_qty: Decimal,
    cummulative_quote_qty: Decimal, // (sic) Binance field name
    status: String,
}

impl BinanceClient {
    pub fn new(credentials: BinanceCredentials) -> Result<Self, ExchangeError> {
        Self::with_options(
            credentials,
            BINANCE_API_BASE,
            DEFAULT_RECV_WINDOW_MS,
            DEFAULT_RATE_LIMIT_RPM,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client against an explicit endpoint (testnet, local mock)
    pub fn with_options(
        credentials: BinanceCredentials,
        base_url: &str,
        recv_window_ms: u64,
        requests_per_minute: u32,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder().timeout(timeout).build()?;

        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            recv_window_ms,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// HMAC-SHA256 of the query string, hex encoded
    pub fn sign(&self, query: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Signing(e.to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}{}?{}", self.base_url, path, encode_query(params));
        tracing::debug!(url = %url, "Binance public request");

        self.rate_limiter.until_ready().await;
        let response = self.client.get(&url).send().await?;
        Self::parse_response(response).await
    }

    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let mut params = params.to_vec();
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query = encode_query(&params);
        let signature = self.sign(&query)?;
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);
        tracing::debug!(method = %method, path = %path, "Binance signed request");

        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ExchangeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => ExchangeError::Api {
                    code: err.code,
                    msg: err.msg,
                },
                Err(_) => ExchangeError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    async fn market_order(
        &self,
        pair: &TradingPair,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        let client_order_id = Uuid::new_v4().simple().to_string();
        let params = [
            ("symbol", pair.symbol()),
            ("side", side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("newClientOrderId", client_order_id),
            ("newOrderRespType", "RESULT".to_string()),
        ];

        let response: OrderResponse = self
            .signed_request(Method::POST, "/api/v3/order", &params)
            .await?;

        tracing::info!(
            symbol = %pair.symbol(),
            side = %side,
            order_id = response.order_id,
            executed_qty = %response.executed_qty,
            status = %response.status,
            "Binance market order accepted"
        );

        Ok(OrderResult {
            order_id: response.order_id.to_string(),
            client_order_id: Some(response.client_order_id),
            side,
            executed_qty: response.executed_qty,
            quote_qty: response.cummulative_quote_qty,
            status: response.status,
            transact_time: DateTime::from_timestamp_millis(response.transact_time)
                .unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl Exchange for BinanceClient {
    async fn fetch_daily_candle(
        &self,
        pair: &TradingPair,
        utc_day_start: DateTime<Utc>,
    ) -> Result<DailyCandle, ExchangeError> {
        let params = [
            ("symbol", pair.symbol()),
            ("interval", "1d".to_string()),
            ("startTime", utc_day_start.timestamp_millis().to_string()),
            ("limit", "1".to_string()),
        ];

        let rows: Vec<Vec<serde_json::Value>> = self.public_get("/api/v3/klines", &params).await?;
        let row = rows.first().ok_or_else(|| {
            ExchangeError::NoData(format!(
                "no daily kline for {} since {}",
                pair.symbol(),
                utc_day_start.format("%Y-%m-%d")
            ))
        })?;

        parse_kline(row)
    }

    async fn fetch_current_price(&self, pair: &TradingPair) -> Result<Decimal, ExchangeError> {
        let ticker: TickerPrice = self
            .public_get("/api/v3/ticker/price", &[("symbol", pair.symbol())])
            .await?;
        Ok(ticker.price)
    }

    async fn fetch_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        let account: AccountInfo = self
            .signed_request(Method::GET, "/api/v3/account", &[("omitZeroBalances", "true".to_string())])
            .await?;

        // Zero balances are omitted, so a missing asset means nothing free
        Ok(account
            .balances
            .into_iter()
            .find(|b| b.asset.eq_ignore_ascii_case(asset))
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO))
    }

    async fn submit_market_buy(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        self.market_order(pair, OrderSide::Buy, quantity).await
    }

    async fn submit_market_sell(
        &self,
        pair: &TradingPair,
        quantity: Decimal,
    ) -> Result<OrderResult, ExchangeError> {
        self.market_order(pair, OrderSide::Sell, quantity).await
    }
}

fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Kline rows are `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`
fn parse_kline(row: &[serde_json::Value]) -> Result<DailyCandle, ExchangeError> {
    let timestamp = row
        .first()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ExchangeError::Decode("kline open time missing".to_string()))?;

    Ok(DailyCandle {
        timestamp,
        open: decimal_at(row, 1, "open")?,
        high: decimal_at(row, 2, "high")?,
        low: decimal_at(row, 3, "low")?,
        close: decimal_at(row, 4, "close")?,
    })
}

fn decimal_at(row: &[serde_json::Value], idx: usize, field: &str) -> Result<Decimal, ExchangeError> {
    row.get(idx)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ExchangeError::Decode(format!("kline {} missing", field)))?
        .parse()
        .map_err(|e| ExchangeError::Decode(format!("kline {}: {}", field, e)))
}
