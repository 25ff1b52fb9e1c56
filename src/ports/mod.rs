//! Port traits decoupling the domain from I/O.

pub mod config_port;
pub mod journal_port;
pub mod market_port;
pub mod sentiment_port;
