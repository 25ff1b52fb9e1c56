//! Durable trade journal and breaker state port trait.

use crate::domain::breaker::CircuitBreakerState;
use crate::domain::error::KestrelError;
use crate::domain::position::TradeRecord;

/// Durable store behind the executor. Breaker state lives under global,
/// symbol-agnostic keys: one breaker guards every symbol.
pub trait JournalPort {
    /// Append a closed trade and persist the post-close breaker state in
    /// one atomic step. Returns the journal id of the trade row.
    fn append_trade(
        &self,
        record: &TradeRecord,
        breaker: &CircuitBreakerState,
    ) -> Result<i64, KestrelError>;

    fn load_circuit_state(&self) -> Result<CircuitBreakerState, KestrelError>;

    fn save_circuit_state(&self, state: &CircuitBreakerState) -> Result<(), KestrelError>;

    /// Most recent closed trades, newest first.
    fn recent_trades(&self, limit: usize) -> Result<Vec<TradeRecord>, KestrelError>;
}
