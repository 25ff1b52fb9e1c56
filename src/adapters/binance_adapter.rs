//! Binance Futures market data adapter.
//!
//! Talks to the public fapi endpoints with a blocking client. The candle
//! feed parses strictly and fails loudly; the auxiliary ratio and whale
//! feeds degrade to neutral values with a warning so one flaky endpoint
//! cannot abort a symbol's cycle.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::domain::candle::Candle;
use crate::domain::error::KestrelError;
use crate::ports::market_port::MarketDataPort;

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

pub struct BinanceAdapter {
    client: Client,
    base_url: String,
    blacklist: Vec<String>,
}

impl BinanceAdapter {
    /// `blacklist` is excluded from the pair scan before ranking, so
    /// blacklisted symbols never consume top-pair slots.
    pub fn new(
        base_url: impl Into<String>,
        blacklist: Vec<String>,
    ) -> Result<BinanceAdapter, KestrelError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent("kestrel/0.1")
            .build()
            .map_err(|e| fetch_err("client", e.to_string()))?;
        Ok(BinanceAdapter {
            client,
            base_url: base_url.into(),
            blacklist,
        })
    }

    fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<Value, KestrelError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| fetch_err(context, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(context, format!("HTTP {status}")));
        }

        response
            .json::<Value>()
            .map_err(|e| fetch_err(context, e.to_string()))
    }

    fn fetch_ratio(&self, symbol: &str) -> Result<f64, KestrelError> {
        let body = self.get_json(
            "/futures/data/globalLongShortAccountRatio",
            &[("symbol", symbol), ("period", "1h"), ("limit", "1")],
            symbol,
        )?;
        let entry = body
            .as_array()
            .and_then(|rows| rows.first())
            .ok_or_else(|| fetch_err(symbol, "empty long/short ratio response"))?;
        number_field(&entry["longShortRatio"])
            .ok_or_else(|| fetch_err(symbol, "malformed longShortRatio field"))
    }

    fn fetch_taker_flow(&self, symbol: &str) -> Result<f64, KestrelError> {
        let body = self.get_json(
            "/futures/data/takerlongshortRatio",
            &[("symbol", symbol), ("period", "1h"), ("limit", "1")],
            symbol,
        )?;
        let entry = body
            .as_array()
            .and_then(|rows| rows.first())
            .ok_or_else(|| fetch_err(symbol, "empty taker volume response"))?;
        let buy_vol = number_field(&entry["buyVol"]).unwrap_or(0.0);
        let sell_vol = number_field(&entry["sellVol"]).unwrap_or(0.0);
        Ok(buy_vol - sell_vol)
    }
}

impl MarketDataPort for BinanceAdapter {
    fn fetch_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, KestrelError> {
        let limit_str = limit.to_string();
        let body = self.get_json(
            "/fapi/v1/klines",
            &[
                ("symbol", symbol),
                ("interval", interval),
                ("limit", &limit_str),
            ],
            symbol,
        )?;

        let rows = body
            .as_array()
            .ok_or_else(|| fetch_err(symbol, "kline response is not an array"))?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            candles
                .push(parse_kline(row).ok_or_else(|| fetch_err(symbol, "malformed kline row"))?);
        }
        Ok(candles)
    }

    fn long_short_ratio(&self, symbol: &str) -> f64 {
        match self.fetch_ratio(symbol) {
            Ok(ratio) => ratio,
            Err(e) => {
                warn!(symbol, error = %e, "long/short ratio fetch failed, assuming neutral");
                1.0
            }
        }
    }

    fn whale_net_volume(&self, symbol: &str) -> f64 {
        match self.fetch_taker_flow(symbol) {
            Ok(net) => net,
            Err(e) => {
                warn!(symbol, error = %e, "taker volume fetch failed, assuming neutral");
                0.0
            }
        }
    }

    fn top_pairs(&self, count: usize) -> Result<Vec<String>, KestrelError> {
        let body = self.get_json("/fapi/v1/ticker/24hr", &[], "ticker/24hr")?;
        let rows = body
            .as_array()
            .ok_or_else(|| fetch_err("ticker/24hr", "ticker response is not an array"))?;

        let mut pairs: Vec<(String, f64)> = rows
            .iter()
            .filter_map(|ticker| {
                let symbol = ticker.get("symbol")?.as_str()?;
                if !symbol.ends_with("USDT") {
                    return None;
                }
                if self.blacklist.iter().any(|banned| banned == symbol) {
                    return None;
                }
                let volume = ticker
                    .get("quoteVolume")
                    .and_then(number_field)
                    .unwrap_or(0.0);
                Some((symbol.to_string(), volume))
            })
            .collect();

        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs.truncate(count);
        Ok(pairs.into_iter().map(|(symbol, _)| symbol).collect())
    }
}

/// Kline rows are `[openTime, open, high, low, close, volume, ...]` with
/// the prices encoded as strings.
fn parse_kline(row: &Value) -> Option<Candle> {
    let fields = row.as_array()?;
    Some(Candle {
        high: number_field(fields.get(2)?)?,
        low: number_field(fields.get(3)?)?,
        close: number_field(fields.get(4)?)?,
    })
}

/// Binance encodes most numeric fields as strings; accept either shape.
fn number_field(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn fetch_err(context: &str, reason: impl Into<String>) -> KestrelError {
    KestrelError::Fetch {
        context: context.to_string(),
        reason: reason.into(),
    }
}
