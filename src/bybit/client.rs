// =============================================================================
// Bybit REST API Client — public market data (v5 kline endpoint)
// =============================================================================
//
// Only public endpoints are used, so no credential or request signing is
// involved. Bybit returns klines newest-first; callers always receive them
// oldest-first with timestamps in whole seconds, and a row with an
// unparseable close is carried forward from its predecessor rather than
// dropped so downstream series keep a stable length.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::types::Candle;

const BYBIT_BASE_URL: &str = "https://api.bybit.com";

/// Bybit public REST client for linear-perpetual market data.
#[derive(Clone)]
pub struct BybitClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for BybitClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BybitClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new() -> Self {
        Self::with_base_url(BYBIT_BASE_URL.to_string())
    }

    /// Custom base URL constructor (used by tests against a stub server).
    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("failed to build reqwest client");

        debug!(%base_url, "BybitClient initialised");

        Self { base_url, client }
    }

    // -------------------------------------------------------------------------
    // Interval handling
    // -------------------------------------------------------------------------

    /// Map a user-facing interval label onto Bybit's wire code.
    ///
    /// Unknown labels fall back to one hour rather than failing the request.
    pub fn map_interval(ui_interval: &str) -> &'static str {
        match ui_interval {
            "15m" => "15",
            "1h" => "60",
            "4h" => "240",
            "1d" => "D",
            _ => "60",
        }
    }

    /// Duration of one candle for a Bybit wire interval, in seconds.
    pub fn interval_seconds(interval: &str) -> i64 {
        match interval {
            "D" => 86_400,
            "W" => 7 * 86_400,
            "M" => 30 * 86_400,
            other => other.parse::<i64>().map(|m| m * 60).unwrap_or(3_600),
        }
    }

    // -------------------------------------------------------------------------
    // Market data
    // -------------------------------------------------------------------------

    /// GET /v5/market/kline for a linear-perpetual symbol.
    ///
    /// `from_ts` (whole seconds) requests history starting at that point;
    /// without it Bybit serves the most recent `limit` candles.
    #[instrument(skip(self), name = "bybit::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
        from_ts: Option<i64>,
    ) -> Result<Vec<Candle>> {
        let mut url = format!(
            "{}/v5/market/kline?category=linear&symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );
        if let Some(from) = from_ts {
            url.push_str(&format!("&start={}", from * 1000));
        }

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /v5/market/kline request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse kline response")?;

        if !status.is_success() {
            anyhow::bail!("Bybit GET /v5/market/kline returned {}: {}", status, body);
        }

        let candles = parse_kline_response(&body)
            .with_context(|| format!("kline payload for {symbol} ({interval})"))?;

        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

impl std::fmt::Debug for BybitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Parse a Bybit v5 kline envelope into oldest-first candles.
///
/// Array indices per row:
///   [0] startTime (ms), [1] open, [2] high, [3] low, [4] close,
///   [5] volume, [6] turnover
///
/// Rows whose close does not parse inherit the previous close (the first
/// such row gets 0.0), and their open/high/low collapse onto that close so
/// the gap cannot fabricate a range.
fn parse_kline_response(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let ret_code = body["retCode"].as_i64().unwrap_or(-1);
    if ret_code != 0 {
        let msg = body["retMsg"].as_str().unwrap_or("unknown error");
        anyhow::bail!("Bybit error retCode={ret_code}: {msg}");
    }

    let rows = body["result"]["list"]
        .as_array()
        .context("kline result.list is not an array")?;
    if rows.is_empty() {
        anyhow::bail!("Bybit returned no candles");
    }

    // Newest-first on the wire; flip to chronological order.
    let mut candles = Vec::with_capacity(rows.len());
    for entry in rows.iter().rev() {
        let arr = match entry.as_array() {
            Some(a) if a.len() >= 6 => a,
            _ => {
                warn!("skipping malformed kline row");
                continue;
            }
        };

        let timestamp = parse_lenient_f64(&arr[0]).map(|ms| (ms / 1000.0) as i64).unwrap_or(0);
        let open = parse_lenient_f64(&arr[1]).unwrap_or(f64::NAN);
        let high = parse_lenient_f64(&arr[2]).unwrap_or(f64::NAN);
        let low = parse_lenient_f64(&arr[3]).unwrap_or(f64::NAN);
        let close = parse_lenient_f64(&arr[4]).unwrap_or(f64::NAN);
        let volume = parse_lenient_f64(&arr[5]).unwrap_or(0.0);

        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume: if volume.is_nan() { 0.0 } else { volume },
        });
    }

    // Gap-fill: a NaN close inherits the previous close, and the row's
    // remaining NaN prices collapse onto that close.
    let mut prev_close = 0.0;
    for c in &mut candles {
        if c.close.is_nan() {
            c.close = prev_close;
        }
        if c.open.is_nan() {
            c.open = c.close;
        }
        if c.high.is_nan() {
            c.high = c.close;
        }
        if c.low.is_nan() {
            c.low = c.close;
        }
        prev_close = c.close;
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_lenient_f64(val: &serde_json::Value) -> Option<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>().ok()
    } else {
        val.as_f64()
    }
}
