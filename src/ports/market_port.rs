//! Market data access port trait.

use crate::domain::candle::Candle;
use crate::domain::error::KestrelError;

pub trait MarketDataPort {
    /// Chronological candles, oldest first. Fails with
    /// [`KestrelError::Fetch`] on network or parse trouble.
    fn fetch_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, KestrelError>;

    /// Latest global long/short account ratio (< 1 means the crowd is net
    /// short). Degrades to a neutral 1.0 instead of failing.
    fn long_short_ratio(&self, symbol: &str) -> f64;

    /// Taker buy volume minus sell volume, a whale-flow proxy. Degrades to
    /// a neutral 0.0 instead of failing.
    fn whale_net_volume(&self, symbol: &str) -> f64;

    /// Top `count` tradable pairs ranked by 24h quote volume.
    fn top_pairs(&self, count: usize) -> Result<Vec<String>, KestrelError>;
}
