//! Market regime classification from trend strength.

use serde::Serialize;
use std::fmt;

/// ADX-derived trendiness label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Regime {
    Trending,
    Choppy,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Trending => write!(f, "TRENDING"),
            Regime::Choppy => write!(f, "CHOPPY"),
        }
    }
}

/// Trending iff `adx` meets the threshold.
pub fn classify_regime(adx: f64, threshold: f64) -> Regime {
    if adx >= threshold {
        Regime::Trending
    } else {
        Regime::Choppy
    }
}
