//! Technical indicator implementations.
//!
//! Each indicator lives in its own module and computes the latest value for
//! a chronological series, failing with [`KestrelError::InsufficientData`]
//! when the series is too short to warm up.

pub mod adx;
pub mod bollinger;
pub mod rsi;

pub use adx::compute_adx;
pub use bollinger::{compute_bollinger, BollingerBands};
pub use rsi::compute_rsi;

use serde::Serialize;

use crate::domain::candle::{closes, Candle};
use crate::domain::error::KestrelError;
use crate::domain::settings::IndicatorSettings;

/// All indicator values derived for one symbol in one cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub adx: f64,
    pub bollinger: BollingerBands,
}

impl IndicatorSnapshot {
    pub fn compute(
        candles: &[Candle],
        cfg: &IndicatorSettings,
    ) -> Result<IndicatorSnapshot, KestrelError> {
        let close_series = closes(candles);
        Ok(IndicatorSnapshot {
            rsi: compute_rsi(&close_series, cfg.rsi_period)?,
            adx: compute_adx(candles, cfg.adx_period)?,
            bollinger: compute_bollinger(&close_series, cfg.bb_period, cfg.bb_std)?,
        })
    }
}
