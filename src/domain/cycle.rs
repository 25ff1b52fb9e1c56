//! One fetch -> analyse -> decide -> execute cycle for a single symbol.
//!
//! Fetch and warmup failures are converted into skip outcomes here, at the
//! cycle boundary, so one bad symbol never takes down the scan loop.
//! Journal and position-state errors propagate: breaker correctness
//! depends on the store, so they are fatal.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::error::KestrelError;
use super::executor::{ExecutionOutcome, PaperTrader};
use super::indicator::IndicatorSnapshot;
use super::regime::{classify_regime, Regime};
use super::signal::{generate_signal, MarketContext, Signal};
use super::settings::Settings;
use crate::ports::journal_port::JournalPort;
use crate::ports::market_port::MarketDataPort;
use crate::ports::sentiment_port::SentimentPort;

/// How a symbol's cycle ended. Skips and fetch failures are reported
/// results, not errors.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum CycleOutcome {
    Executed(ExecutionOutcome),
    SkippedChoppy { adx: f64 },
    SkippedInsufficientData { bars: usize, minimum: usize },
    FetchFailed { reason: String },
}

/// Everything observed and decided for one symbol in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub symbol: String,
    pub price: Option<f64>,
    pub snapshot: Option<IndicatorSnapshot>,
    pub context: Option<MarketContext>,
    pub signal: Option<Signal>,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    fn aborted(symbol: &str, outcome: CycleOutcome) -> CycleReport {
        CycleReport {
            symbol: symbol.to_string(),
            price: None,
            snapshot: None,
            context: None,
            signal: None,
            outcome,
        }
    }
}

pub fn run_cycle(
    market: &dyn MarketDataPort,
    sentiment: &mut dyn SentimentPort,
    trader: &mut PaperTrader,
    journal: &dyn JournalPort,
    settings: &Settings,
    symbol: &str,
    now: DateTime<Utc>,
) -> Result<CycleReport, KestrelError> {
    info!(symbol, "analysing");

    let candles = match market.fetch_ohlc(
        symbol,
        &settings.market.timeframe,
        settings.market.kline_limit,
    ) {
        Ok(candles) => candles,
        Err(KestrelError::Fetch { reason, .. }) => {
            warn!(symbol, %reason, "candle fetch failed, skipping symbol");
            return Ok(CycleReport::aborted(
                symbol,
                CycleOutcome::FetchFailed { reason },
            ));
        }
        Err(e) => return Err(e),
    };

    let Some(last) = candles.last() else {
        warn!(symbol, "empty candle response, skipping symbol");
        return Ok(CycleReport::aborted(
            symbol,
            CycleOutcome::FetchFailed {
                reason: "empty candle response".to_string(),
            },
        ));
    };
    let price = last.close;

    let snapshot = match IndicatorSnapshot::compute(&candles, &settings.indicators) {
        Ok(snapshot) => snapshot,
        Err(KestrelError::InsufficientData { bars, minimum }) => {
            warn!(symbol, bars, minimum, "not enough bars, skipping symbol");
            return Ok(CycleReport::aborted(
                symbol,
                CycleOutcome::SkippedInsufficientData { bars, minimum },
            ));
        }
        Err(e) => return Err(e),
    };

    let regime = classify_regime(snapshot.adx, settings.signal.adx_threshold);
    info!(symbol, price, adx = snapshot.adx, %regime, "market regime");

    // A choppy market takes no new entries; with nothing open there is
    // nothing left to decide. An open position still gets the full pass
    // so the overbought exit can fire.
    if regime == Regime::Choppy && !trader.portfolio.has_position(symbol) {
        info!(symbol, "choppy and flat, skipping");
        return Ok(CycleReport {
            symbol: symbol.to_string(),
            price: Some(price),
            snapshot: Some(snapshot),
            context: None,
            signal: None,
            outcome: CycleOutcome::SkippedChoppy { adx: snapshot.adx },
        });
    }

    let long_short_ratio = market.long_short_ratio(symbol);
    let whale_net_volume = market.whale_net_volume(symbol);
    let sentiment_label = sentiment.sentiment_for(symbol);
    info!(
        symbol,
        rsi = snapshot.rsi,
        long_short_ratio,
        whale_net_volume,
        sentiment = %sentiment_label,
        "market context"
    );

    let context = MarketContext {
        regime,
        long_short_ratio,
        whale_net_volume,
        sentiment: sentiment_label,
    };
    let signal = generate_signal(snapshot.rsi, &context, &settings.signal);
    info!(symbol, %signal, "signal");

    let outcome = trader.execute(signal, price, symbol, journal, now)?;

    Ok(CycleReport {
        symbol: symbol.to_string(),
        price: Some(price),
        snapshot: Some(snapshot),
        context: Some(context),
        signal: Some(signal),
        outcome: CycleOutcome::Executed(outcome),
    })
}
