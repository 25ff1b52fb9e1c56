//! Open positions and closed-trade records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::KestrelError;

/// Parse failure when decoding a journal enum column.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognised value: {0}")]
pub struct ParseEnumError(pub String);

/// Trade direction. Entries are long-only today; the enum keeps the
/// journal schema honest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

/// Lifecycle of a journal row. Closes are the only writes today, so rows
/// land already `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeStatus {
    Open,
    Closed,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "OPEN"),
            TradeStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

impl FromStr for TradeStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(TradeStatus::Open),
            "CLOSED" => Ok(TradeStatus::Closed),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

/// A single open long position. At most one exists per symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub size_usd: f64,
}

impl Position {
    /// Realised USD PnL for closing the full position at `exit_price`.
    ///
    /// LONG: (exit - entry) / entry * size_usd. A non-positive entry price
    /// means corrupt position state and fails fast.
    pub fn realized_pnl(&self, exit_price: f64) -> Result<f64, KestrelError> {
        if self.entry_price <= 0.0 {
            return Err(KestrelError::InvalidPosition {
                reason: format!(
                    "non-positive entry price {} for {}",
                    self.entry_price, self.symbol
                ),
            });
        }
        Ok((exit_price - self.entry_price) / self.entry_price * self.size_usd)
    }
}

/// One closed trade, appended to the journal exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub size_usd: f64,
    pub pnl: f64,
    pub status: TradeStatus,
}
