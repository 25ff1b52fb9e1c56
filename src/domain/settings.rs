//! Typed runtime settings assembled from the configuration port.
//!
//! Every tunable has a default matching the shipped strategy, so an empty
//! config file yields a working engine; validation rejects values that
//! would make the maths or the state machine nonsensical.

use crate::domain::error::KestrelError;
use crate::ports::config_port::ConfigPort;

/// Stablecoin and fiat pairs that are never worth trading.
const DEFAULT_BLACKLIST: &[&str] = &[
    "USDCUSDT",
    "USDPUSDT",
    "DAIUSDT",
    "BUSDUSDT",
    "TUSDUSDT",
    "FDUSDUSDT",
    "EURUSDT",
];

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSettings {
    pub rsi_period: usize,
    pub adx_period: usize,
    pub bb_period: usize,
    pub bb_std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSettings {
    pub adx_threshold: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub ls_ratio_max: f64,
    pub whale_min: f64,
    pub bearish_news_veto: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSettings {
    pub max_consecutive_losses: u32,
    pub cooldown_hours: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingSettings {
    pub trade_size_usd: f64,
    pub initial_balance_usd: f64,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSettings {
    pub timeframe: String,
    pub kline_limit: usize,
    pub top_pairs: usize,
    pub blacklist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsSettings {
    pub api_key: Option<String>,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub indicators: IndicatorSettings,
    pub signal: SignalSettings,
    pub breaker: BreakerSettings,
    pub trading: TradingSettings,
    pub market: MarketSettings,
    pub news: NewsSettings,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Settings, KestrelError> {
        let settings = Settings {
            indicators: IndicatorSettings {
                rsi_period: positive_period(config, "indicators", "rsi_period", 14)?,
                adx_period: positive_period(config, "indicators", "adx_period", 14)?,
                bb_period: positive_period(config, "indicators", "bb_period", 20)?,
                bb_std: config.get_double("indicators", "bb_std", 2.0),
            },
            signal: SignalSettings {
                adx_threshold: config.get_double("signal", "adx_threshold", 25.0),
                rsi_overbought: config.get_double("signal", "rsi_overbought", 70.0),
                rsi_oversold: config.get_double("signal", "rsi_oversold", 30.0),
                ls_ratio_max: config.get_double("signal", "ls_ratio_max", 0.8),
                whale_min: config.get_double("signal", "whale_min", 0.0),
                bearish_news_veto: config.get_bool("signal", "bearish_news_veto", false),
            },
            breaker: BreakerSettings {
                max_consecutive_losses: positive_int(
                    config,
                    "breaker",
                    "max_consecutive_losses",
                    3,
                )? as u32,
                cooldown_hours: positive_int(config, "breaker", "cooldown_hours", 24)?,
            },
            trading: TradingSettings {
                trade_size_usd: config.get_double("trading", "trade_size_usd", 100.0),
                initial_balance_usd: config.get_double("trading", "initial_balance_usd", 10_000.0),
                poll_interval_secs: positive_int(config, "trading", "poll_interval_secs", 300)?
                    as u64,
            },
            market: MarketSettings {
                timeframe: config
                    .get_string("market", "timeframe")
                    .unwrap_or_else(|| "1h".to_string()),
                kline_limit: positive_period(config, "market", "kline_limit", 100)?,
                top_pairs: positive_period(config, "market", "top_pairs", 10)?,
                blacklist: config.get_list("market", "blacklist").unwrap_or_else(|| {
                    DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect()
                }),
            },
            news: NewsSettings {
                api_key: config.get_string("news", "api_key"),
                poll_interval_secs: positive_int(config, "news", "poll_interval_secs", 900)?
                    as u64,
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), KestrelError> {
        if self.indicators.bb_std < 0.0 {
            return Err(invalid("indicators", "bb_std", "must not be negative"));
        }
        if self.signal.rsi_oversold >= self.signal.rsi_overbought {
            return Err(invalid(
                "signal",
                "rsi_oversold",
                "must be below rsi_overbought",
            ));
        }
        if self.signal.ls_ratio_max <= 0.0 {
            return Err(invalid("signal", "ls_ratio_max", "must be positive"));
        }
        if self.trading.trade_size_usd <= 0.0 {
            return Err(invalid("trading", "trade_size_usd", "must be positive"));
        }
        if self.trading.initial_balance_usd < 0.0 {
            return Err(invalid(
                "trading",
                "initial_balance_usd",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, KestrelError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(invalid(section, key, &format!("must be positive, got {value}")));
    }
    Ok(value)
}

fn positive_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, KestrelError> {
    Ok(positive_int(config, section, key, default)? as usize)
}

fn invalid(section: &str, key: &str, reason: &str) -> KestrelError {
    KestrelError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
