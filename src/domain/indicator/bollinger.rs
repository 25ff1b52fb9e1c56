//! Bollinger Bands.
//!
//! Middle band is the SMA over the last `period` closes; the outer bands
//! sit `num_std` population standard deviations away (divides by N, not
//! N-1).

use serde::Serialize;

use crate::domain::error::KestrelError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bands for the latest bar of a chronological close series.
pub fn compute_bollinger(
    closes: &[f64],
    period: usize,
    num_std: f64,
) -> Result<BollingerBands, KestrelError> {
    if period == 0 || closes.len() < period {
        return Err(KestrelError::InsufficientData {
            bars: closes.len(),
            minimum: period.max(1),
        });
    }

    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let variance = window
        .iter()
        .map(|close| {
            let diff = close - middle;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;
    let stddev = variance.sqrt();

    Ok(BollingerBands {
        upper: middle + num_std * stddev,
        middle,
        lower: middle - num_std * stddev,
    })
}
