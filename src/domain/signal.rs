//! Contrarian signal generation.
//!
//! SELL exits on an overbought RSI in any regime; BUY entries only in a
//! trending market when the crowd is net short and whale flow is positive.

use serde::Serialize;
use std::fmt;

use super::regime::Regime;
use super::settings::SignalSettings;

/// Discrete trading action for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// News sentiment label for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "BULLISH"),
            Sentiment::Bearish => write!(f, "BEARISH"),
            Sentiment::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Auxiliary market state consumed alongside the RSI reading.
#[derive(Debug, Clone, Serialize)]
pub struct MarketContext {
    pub regime: Regime,
    pub long_short_ratio: f64,
    pub whale_net_volume: f64,
    pub sentiment: Sentiment,
}

/// Priority-ordered contrarian decision; earlier rules win.
///
/// 1. Overbought RSI exits in any regime, so a position can never be
///    trapped once the trend dies.
/// 2. No new entries outside a trending regime.
/// 3. Oversold RSI while the crowd is short and whales are buying enters
///    long. With `bearish_news_veto` enabled, bearish news suppresses the
///    entry; news never manufactures one.
/// 4. Otherwise hold.
pub fn generate_signal(rsi: f64, ctx: &MarketContext, cfg: &SignalSettings) -> Signal {
    if rsi > cfg.rsi_overbought {
        return Signal::Sell;
    }

    if ctx.regime != Regime::Trending {
        return Signal::Hold;
    }

    if rsi < cfg.rsi_oversold
        && ctx.long_short_ratio < cfg.ls_ratio_max
        && ctx.whale_net_volume > cfg.whale_min
    {
        if cfg.bearish_news_veto && ctx.sentiment == Sentiment::Bearish {
            return Signal::Hold;
        }
        return Signal::Buy;
    }

    Signal::Hold
}
