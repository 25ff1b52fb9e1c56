#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use kestrel::adapters::file_config_adapter::FileConfigAdapter;
use kestrel::domain::breaker::CircuitBreaker;
use kestrel::domain::candle::Candle;
use kestrel::domain::error::KestrelError;
use kestrel::domain::executor::PaperTrader;
use kestrel::domain::settings::Settings;
use kestrel::domain::signal::Sentiment;
use kestrel::ports::market_port::MarketDataPort;
use kestrel::ports::sentiment_port::SentimentPort;

pub struct MockMarketPort {
    pub candles: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
    pub ls_ratio: f64,
    pub whale_net_volume: f64,
    pub pairs: Vec<String>,
}

impl MockMarketPort {
    pub fn new() -> MockMarketPort {
        MockMarketPort {
            candles: HashMap::new(),
            errors: HashMap::new(),
            ls_ratio: 1.0,
            whale_net_volume: 0.0,
            pairs: Vec::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> MockMarketPort {
        self.candles.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> MockMarketPort {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_ratio(mut self, ls_ratio: f64) -> MockMarketPort {
        self.ls_ratio = ls_ratio;
        self
    }

    pub fn with_whale_volume(mut self, whale_net_volume: f64) -> MockMarketPort {
        self.whale_net_volume = whale_net_volume;
        self
    }

    pub fn with_pairs(mut self, pairs: &[&str]) -> MockMarketPort {
        self.pairs = pairs.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl MarketDataPort for MockMarketPort {
    fn fetch_ohlc(
        &self,
        symbol: &str,
        _interval: &str,
        _limit: usize,
    ) -> Result<Vec<Candle>, KestrelError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(KestrelError::Fetch {
                context: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.candles.get(symbol).cloned().unwrap_or_default())
    }

    fn long_short_ratio(&self, _symbol: &str) -> f64 {
        self.ls_ratio
    }

    fn whale_net_volume(&self, _symbol: &str) -> f64 {
        self.whale_net_volume
    }

    fn top_pairs(&self, count: usize) -> Result<Vec<String>, KestrelError> {
        Ok(self.pairs.iter().take(count).cloned().collect())
    }
}

pub struct MockSentimentPort {
    pub sentiment: Sentiment,
}

impl MockSentimentPort {
    pub fn neutral() -> MockSentimentPort {
        MockSentimentPort {
            sentiment: Sentiment::Neutral,
        }
    }

    pub fn with(sentiment: Sentiment) -> MockSentimentPort {
        MockSentimentPort { sentiment }
    }
}

impl SentimentPort for MockSentimentPort {
    fn sentiment_for(&mut self, _symbol: &str) -> Sentiment {
        self.sentiment
    }
}

/// Monotonic rise: strong trend, overbought RSI.
pub fn rising_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64 * 2.0;
            Candle {
                high: close + 1.0,
                low: close - 1.0,
                close,
            }
        })
        .collect()
}

/// Monotonic fall: strong trend, oversold RSI.
pub fn falling_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 1000.0 - i as f64 * 2.0;
            Candle {
                high: close + 1.0,
                low: close - 1.0,
                close,
            }
        })
        .collect()
}

/// Bounded oscillation: no direction, low ADX.
pub fn choppy_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64).sin() * 0.5;
            Candle {
                high: close + 0.2,
                low: close - 0.2,
                close,
            }
        })
        .collect()
}

pub fn default_settings() -> Settings {
    let adapter = FileConfigAdapter::from_string("").unwrap();
    Settings::from_config(&adapter).unwrap()
}

pub fn settings_from(content: &str) -> Settings {
    let adapter = FileConfigAdapter::from_string(content).unwrap();
    Settings::from_config(&adapter).unwrap()
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn paper_trader(settings: &Settings) -> PaperTrader {
    PaperTrader::new(
        settings.trading.initial_balance_usd,
        settings.trading.trade_size_usd,
        CircuitBreaker::new(
            settings.breaker.max_consecutive_losses,
            settings.breaker.cooldown_hours,
        ),
    )
}
