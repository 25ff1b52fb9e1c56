//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - Seed: simple mean of gains/losses over the first `period` changes
//! - Subsequent: avg = (prev_avg * (period - 1) + current) / period
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)), exactly 100 when
//! avg_loss is zero.

use crate::domain::error::KestrelError;

/// Latest RSI for a chronological close series. Needs `period + 1` closes.
pub fn compute_rsi(closes: &[f64], period: usize) -> Result<f64, KestrelError> {
    let minimum = period + 1;
    if period == 0 || closes.len() < minimum {
        return Err(KestrelError::InsufficientData {
            bars: closes.len(),
            minimum,
        });
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = deltas[..period]
        .iter()
        .map(|d| d.max(0.0))
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = deltas[..period]
        .iter()
        .map(|d| (-d).max(0.0))
        .sum::<f64>()
        / period as f64;

    for &delta in &deltas[period..] {
        avg_gain = (avg_gain * (period - 1) as f64 + delta.max(0.0)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + (-delta).max(0.0)) / period as f64;
    }

    if avg_loss == 0.0 {
        return Ok(100.0);
    }

    let rs = avg_gain / avg_loss;
    Ok(100.0 - 100.0 / (1.0 + rs))
}
