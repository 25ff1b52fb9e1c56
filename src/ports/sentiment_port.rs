//! News sentiment port trait.

use crate::domain::signal::Sentiment;

pub trait SentimentPort {
    /// Sentiment label for a symbol. Never fails: implementations degrade
    /// to [`Sentiment::Neutral`] on any internal trouble.
    fn sentiment_for(&mut self, symbol: &str) -> Sentiment;

    /// Market-wide Fear & Greed reading as (value 0-100, classification).
    /// Default implementation reports a neutral market.
    fn fear_and_greed(&mut self) -> (u8, String) {
        (50, "Neutral".to_string())
    }
}
