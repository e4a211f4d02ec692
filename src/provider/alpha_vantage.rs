// =============================================================================
// Alpha Vantage REST Client — TIME_SERIES_INTRADAY
// =============================================================================
//
// SECURITY: The API key travels as a query parameter (that is how the
// provider authenticates) and is never logged or printed via `Debug`.
//
// The free tier answers quota violations with HTTP 200 and a `Note` or
// `Information` field instead of data, so the body has to be inspected even
// when the status is successful.
// =============================================================================

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::DataProvider;
use crate::types::{PriceBar, PriceSeries};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alpha Vantage client for intraday OHLCV history.
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    interval: String,
    output_size: String,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_key`     — Alpha Vantage API key.
    /// * `base_url`    — usually [`DEFAULT_BASE_URL`].
    /// * `interval`    — bar size, e.g. `"5min"`.
    /// * `output_size` — `"compact"` (latest 100 bars) or `"full"`.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        interval: impl Into<String>,
        output_size: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "AlphaVantageClient initialised");

        Ok(Self {
            api_key: api_key.into(),
            base_url,
            interval: interval.into(),
            output_size: output_size.into(),
            client,
        })
    }

    /// GET /query?function=TIME_SERIES_INTRADAY
    #[instrument(skip(self), name = "alpha_vantage::intraday")]
    async fn get_intraday(&self, symbol: &str) -> Result<PriceSeries> {
        let url = format!("{}/query", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", self.interval.as_str()),
                ("outputsize", self.output_size.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("GET /query request failed")?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .context("failed to parse intraday response")?;

        if !status.is_success() {
            bail!("Alpha Vantage GET /query returned {status} for {symbol}");
        }

        let series = parse_intraday(symbol, &self.interval, &body)?;
        debug!(symbol, bars = series.len(), "intraday series fetched");
        Ok(series)
    }
}

#[async_trait]
impl DataProvider for AlphaVantageClient {
    async fn fetch_series(&self, symbol: &str) -> Result<PriceSeries> {
        self.get_intraday(symbol).await
    }

    fn name(&self) -> &'static str {
        "alpha_vantage"
    }
}

/// Parse a `TIME_SERIES_INTRADAY` payload into a chronologically ordered
/// series.
///
/// Payload shape:
/// ```json
/// { "Meta Data": {...},
///   "Time Series (5min)": {
///     "2024-01-05 16:00:00": { "1. open": "...", "2. high": "...",
///                              "3. low": "...", "4. close": "...",
///                              "5. volume": "..." }, ... } }
/// ```
pub fn parse_intraday(symbol: &str, interval: &str, body: &Value) -> Result<PriceSeries> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(msg) = body.get(key).and_then(Value::as_str) {
            bail!("Alpha Vantage refused {symbol}: {msg}");
        }
    }

    let series_key = format!("Time Series ({interval})");
    let entries = body
        .get(&series_key)
        .and_then(Value::as_object)
        .with_context(|| format!("response for {symbol} has no '{series_key}' object"))?;

    let mut bars = Vec::with_capacity(entries.len());
    for (stamp, fields) in entries {
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .with_context(|| format!("bad bar timestamp '{stamp}' for {symbol}"))?
            .and_utc()
            .timestamp_millis();

        let bar = PriceBar::new(
            timestamp,
            field_f64(fields, "1. open")?,
            field_f64(fields, "2. high")?,
            field_f64(fields, "3. low")?,
            field_f64(fields, "4. close")?,
            field_f64(fields, "5. volume")?,
        );
        bars.push(bar);
    }

    // The provider lists newest first; callers need oldest first.
    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    if bars.len() != before {
        warn!(symbol, dropped = before - bars.len(), "duplicate bar timestamps dropped");
    }

    let series = PriceSeries::new(symbol, bars)?;
    if series.is_empty() {
        bail!("response for {symbol} contains an empty time series");
    }
    Ok(series)
}

/// Read a bar field that may be either a string or a number.
fn field_f64(fields: &Value, name: &str) -> Result<f64> {
    let val = fields
        .get(name)
        .with_context(|| format!("bar is missing '{name}'"))?;
    if let Some(s) = val.as_str() {
        s.trim()
            .parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64 for '{name}'"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        bail!("expected string or number for '{name}', got: {val}")
    }
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("interval", &self.interval)
            .field("output_size", &self.output_size)
            .finish()
    }
}
