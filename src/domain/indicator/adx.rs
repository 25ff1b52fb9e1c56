//! ADX (Average Directional Index).
//!
//! Pipeline:
//! 1. True Range, +DM, -DM per bar transition.
//! 2. Wilder running-sum smoothing of each series (seed = sum of first
//!    `period` raw values, then s = s - s/period + new).
//! 3. +DI / -DI as percentages of smoothed TR, DX from their spread.
//! 4. ADX = Wilder-smoothed average of DX (seed = simple mean of the
//!    first `period` DX values).
//!
//! A reading at or above ~25 is usually taken as a trending market.

use crate::domain::candle::Candle;
use crate::domain::error::KestrelError;

/// Latest ADX for a chronological candle series. Needs `2 * period + 1` bars:
/// `period` transitions for the initial smoothing, another `period` DX values
/// to seed the ADX average, plus the first bar that has no predecessor.
pub fn compute_adx(candles: &[Candle], period: usize) -> Result<f64, KestrelError> {
    let minimum = 2 * period + 1;
    if period == 0 || candles.len() < minimum {
        return Err(KestrelError::InsufficientData {
            bars: candles.len(),
            minimum,
        });
    }

    let transitions = candles.len() - 1;
    let mut tr = Vec::with_capacity(transitions);
    let mut plus_dm = Vec::with_capacity(transitions);
    let mut minus_dm = Vec::with_capacity(transitions);

    for pair in candles.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);

        tr.push(cur.true_range(prev.close));

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;
        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
    }

    let smooth_tr = wilder_running_sum(&tr, period);
    let smooth_plus = wilder_running_sum(&plus_dm, period);
    let smooth_minus = wilder_running_sum(&minus_dm, period);

    let mut dx_values = Vec::with_capacity(smooth_tr.len());
    for i in 0..smooth_tr.len() {
        if smooth_tr[i] == 0.0 {
            dx_values.push(0.0);
            continue;
        }
        let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
        let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
        let di_sum = plus_di + minus_di;
        dx_values.push(if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        });
    }

    if dx_values.len() < period {
        return Err(KestrelError::InsufficientData {
            bars: candles.len(),
            minimum,
        });
    }

    let mut adx = dx_values[..period].iter().sum::<f64>() / period as f64;
    for &dx in &dx_values[period..] {
        adx = (adx * (period - 1) as f64 + dx) / period as f64;
    }

    Ok(adx)
}

/// Wilder running-sum smoothing. Output has `values.len() - period + 1`
/// entries, one per bar from the seed onwards.
fn wilder_running_sum(values: &[f64], period: usize) -> Vec<f64> {
    let mut smoothed = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    smoothed.push(sum);
    for &value in &values[period..] {
        sum = sum - sum / period as f64 + value;
        smoothed.push(sum);
    }
    smoothed
}
