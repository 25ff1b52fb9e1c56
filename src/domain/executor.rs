//! Paper-trade execution against the shared portfolio.
//!
//! Per-symbol state machine: flat -> (BUY, breaker armed) -> long ->
//! (SELL) -> flat. Every close commits the trade record and the post-close
//! breaker state to the journal in one transaction before the portfolio
//! mutates, so a store failure leaves balance, positions, and breaker
//! untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::breaker::CircuitBreaker;
use super::error::KestrelError;
use super::portfolio::Portfolio;
use super::position::{Position, Side, TradeRecord, TradeStatus};
use super::signal::Signal;
use crate::ports::journal_port::JournalPort;

/// What the executor did with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Opened,
    Closed,
    Hold,
    Blocked,
    NoAction,
    InsufficientBalance,
}

/// Full account of one `execute` call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub action: Action,
    pub symbol: String,
    pub signal: Signal,
    pub price: f64,
    pub pnl: f64,
    pub size_usd: Option<f64>,
    pub trade_id: Option<i64>,
    pub blocked: bool,
    pub timestamp: DateTime<Utc>,
}

/// Simulated order executor with a multi-asset portfolio and a global
/// circuit breaker.
pub struct PaperTrader {
    pub portfolio: Portfolio,
    pub breaker: CircuitBreaker,
    trade_size_usd: f64,
}

impl PaperTrader {
    pub fn new(initial_balance: f64, trade_size_usd: f64, breaker: CircuitBreaker) -> PaperTrader {
        PaperTrader {
            portfolio: Portfolio::new(initial_balance),
            breaker,
            trade_size_usd,
        }
    }

    /// Process a signal for one symbol at the current price.
    pub fn execute(
        &mut self,
        signal: Signal,
        price: f64,
        symbol: &str,
        journal: &dyn JournalPort,
        now: DateTime<Utc>,
    ) -> Result<ExecutionOutcome, KestrelError> {
        let mut outcome = ExecutionOutcome {
            action: Action::NoAction,
            symbol: symbol.to_string(),
            signal,
            price,
            pnl: 0.0,
            size_usd: None,
            trade_id: None,
            blocked: false,
            timestamp: now,
        };

        // Global gate: losses on any symbol stop everything.
        if !self.breaker.is_allowed(now) {
            warn!(symbol, "circuit breaker active, trade refused");
            outcome.action = Action::Blocked;
            outcome.blocked = true;
            return Ok(outcome);
        }

        if signal == Signal::Hold {
            outcome.action = Action::Hold;
            return Ok(outcome);
        }

        if signal == Signal::Buy && !self.portfolio.has_position(symbol) {
            let size_usd = self.trade_size_usd.min(self.portfolio.balance);
            if size_usd <= 0.0 {
                warn!(symbol, balance = self.portfolio.balance, "no balance left to open");
                outcome.action = Action::InsufficientBalance;
                return Ok(outcome);
            }

            self.portfolio.balance -= size_usd;
            self.portfolio.add_position(Position {
                symbol: symbol.to_string(),
                side: Side::Buy,
                entry_price: price,
                size_usd,
            });
            info!(
                symbol,
                price,
                size_usd,
                balance = self.portfolio.balance,
                open_positions = self.portfolio.position_count(),
                "opened long"
            );
            outcome.action = Action::Opened;
            outcome.size_usd = Some(size_usd);
            return Ok(outcome);
        }

        if signal == Signal::Sell {
            if let Some(position) = self.portfolio.get_position(symbol).cloned() {
                let pnl = position.realized_pnl(price)?;
                let next_breaker = self.breaker.after_close(pnl, now);
                let record = TradeRecord {
                    id: None,
                    timestamp: now,
                    symbol: symbol.to_string(),
                    side: Side::Sell,
                    price,
                    size_usd: position.size_usd,
                    pnl,
                    status: TradeStatus::Closed,
                };

                // The journal write is the commit point for the close.
                let trade_id = journal.append_trade(&record, &next_breaker)?;

                self.breaker.apply(next_breaker);
                self.portfolio.balance += position.size_usd + pnl;
                self.portfolio.remove_position(symbol);
                info!(
                    symbol,
                    price,
                    pnl,
                    trade_id,
                    balance = self.portfolio.balance,
                    "closed long"
                );
                outcome.action = Action::Closed;
                outcome.pnl = pnl;
                outcome.size_usd = Some(position.size_usd);
                outcome.trade_id = Some(trade_id);
                return Ok(outcome);
            }
        }

        // Signal does not match the per-symbol state (BUY while already
        // long, SELL while flat).
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::breaker::CircuitBreakerState;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use std::cell::RefCell;

    struct MemoryJournal {
        trades: RefCell<Vec<TradeRecord>>,
        state: RefCell<CircuitBreakerState>,
        fail_writes: bool,
    }

    impl MemoryJournal {
        fn new() -> MemoryJournal {
            MemoryJournal {
                trades: RefCell::new(Vec::new()),
                state: RefCell::new(CircuitBreakerState::default()),
                fail_writes: false,
            }
        }

        fn failing() -> MemoryJournal {
            MemoryJournal {
                fail_writes: true,
                ..MemoryJournal::new()
            }
        }
    }

    impl JournalPort for MemoryJournal {
        fn append_trade(
            &self,
            record: &TradeRecord,
            breaker: &CircuitBreakerState,
        ) -> Result<i64, KestrelError> {
            if self.fail_writes {
                return Err(KestrelError::Journal {
                    reason: "store offline".into(),
                });
            }
            let mut trades = self.trades.borrow_mut();
            let id = trades.len() as i64 + 1;
            let mut stored = record.clone();
            stored.id = Some(id);
            trades.push(stored);
            *self.state.borrow_mut() = breaker.clone();
            Ok(id)
        }

        fn load_circuit_state(&self) -> Result<CircuitBreakerState, KestrelError> {
            Ok(self.state.borrow().clone())
        }

        fn save_circuit_state(&self, state: &CircuitBreakerState) -> Result<(), KestrelError> {
            *self.state.borrow_mut() = state.clone();
            Ok(())
        }

        fn recent_trades(&self, limit: usize) -> Result<Vec<TradeRecord>, KestrelError> {
            let trades = self.trades.borrow();
            Ok(trades.iter().rev().take(limit).cloned().collect())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn trader() -> PaperTrader {
        PaperTrader::new(10_000.0, 100.0, CircuitBreaker::new(3, 24))
    }

    #[test]
    fn buy_opens_position_and_deducts_balance() {
        let journal = MemoryJournal::new();
        let mut trader = trader();

        let outcome = trader
            .execute(Signal::Buy, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();

        assert_eq!(outcome.action, Action::Opened);
        assert_eq!(outcome.size_usd, Some(100.0));
        assert!(!outcome.blocked);
        assert!(trader.portfolio.has_position("BTCUSDT"));
        assert_relative_eq!(trader.portfolio.balance, 9_900.0);
        assert!(journal.trades.borrow().is_empty());
    }

    #[test]
    fn sell_closes_position_with_pnl() {
        let journal = MemoryJournal::new();
        let mut trader = trader();
        trader
            .execute(Signal::Buy, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();

        let outcome = trader
            .execute(Signal::Sell, 51_000.0, "BTCUSDT", &journal, now())
            .unwrap();

        assert_eq!(outcome.action, Action::Closed);
        assert_relative_eq!(outcome.pnl, 2.0, epsilon = 1e-9);
        assert_eq!(outcome.trade_id, Some(1));
        assert!(!trader.portfolio.has_position("BTCUSDT"));
        assert_relative_eq!(trader.portfolio.balance, 10_002.0, epsilon = 1e-9);

        let trades = journal.trades.borrow();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, Side::Sell);
        assert_eq!(trades[0].status, TradeStatus::Closed);
    }

    #[test]
    fn hold_is_a_no_op() {
        let journal = MemoryJournal::new();
        let mut trader = trader();
        let outcome = trader
            .execute(Signal::Hold, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();
        assert_eq!(outcome.action, Action::Hold);
        assert_relative_eq!(trader.portfolio.balance, 10_000.0);
    }

    #[test]
    fn duplicate_buy_is_no_action() {
        let journal = MemoryJournal::new();
        let mut trader = trader();
        trader
            .execute(Signal::Buy, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();

        let outcome = trader
            .execute(Signal::Buy, 52_000.0, "BTCUSDT", &journal, now())
            .unwrap();

        assert_eq!(outcome.action, Action::NoAction);
        // The original entry is untouched.
        let position = trader.portfolio.get_position("BTCUSDT").unwrap();
        assert_relative_eq!(position.entry_price, 50_000.0);
        assert_relative_eq!(trader.portfolio.balance, 9_900.0);
    }

    #[test]
    fn sell_while_flat_is_no_action() {
        let journal = MemoryJournal::new();
        let mut trader = trader();
        let outcome = trader
            .execute(Signal::Sell, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();
        assert_eq!(outcome.action, Action::NoAction);
        assert!(journal.trades.borrow().is_empty());
    }

    #[test]
    fn exhausted_balance_refuses_open() {
        let journal = MemoryJournal::new();
        let mut trader = PaperTrader::new(0.0, 100.0, CircuitBreaker::new(3, 24));
        let outcome = trader
            .execute(Signal::Buy, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();
        assert_eq!(outcome.action, Action::InsufficientBalance);
        assert!(!trader.portfolio.has_position("BTCUSDT"));
    }

    #[test]
    fn open_size_is_capped_by_balance() {
        let journal = MemoryJournal::new();
        let mut trader = PaperTrader::new(40.0, 100.0, CircuitBreaker::new(3, 24));
        let outcome = trader
            .execute(Signal::Buy, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();
        assert_eq!(outcome.action, Action::Opened);
        assert_eq!(outcome.size_usd, Some(40.0));
        assert_relative_eq!(trader.portfolio.balance, 0.0);
    }

    #[test]
    fn tripped_breaker_blocks_every_symbol() {
        let journal = MemoryJournal::new();
        let mut trader = trader();

        // Three losing round trips on one symbol.
        for _ in 0..3 {
            trader
                .execute(Signal::Buy, 100.0, "BTCUSDT", &journal, now())
                .unwrap();
            trader
                .execute(Signal::Sell, 90.0, "BTCUSDT", &journal, now())
                .unwrap();
        }

        let outcome = trader
            .execute(Signal::Buy, 3_000.0, "ETHUSDT", &journal, now())
            .unwrap();
        assert_eq!(outcome.action, Action::Blocked);
        assert!(outcome.blocked);
        assert!(!trader.portfolio.has_position("ETHUSDT"));
        // And the blocked attempt never reached the journal.
        assert_eq!(journal.trades.borrow().len(), 3);
    }

    #[test]
    fn winning_close_resets_streak() {
        let journal = MemoryJournal::new();
        let mut trader = trader();

        for _ in 0..2 {
            trader
                .execute(Signal::Buy, 100.0, "BTCUSDT", &journal, now())
                .unwrap();
            trader
                .execute(Signal::Sell, 90.0, "BTCUSDT", &journal, now())
                .unwrap();
        }
        trader
            .execute(Signal::Buy, 100.0, "BTCUSDT", &journal, now())
            .unwrap();
        trader
            .execute(Signal::Sell, 110.0, "BTCUSDT", &journal, now())
            .unwrap();

        assert_eq!(trader.breaker.state().consecutive_losses, 0);
        assert_eq!(journal.load_circuit_state().unwrap().consecutive_losses, 0);
    }

    #[test]
    fn positions_on_two_symbols_are_independent() {
        let journal = MemoryJournal::new();
        let mut trader = trader();

        trader
            .execute(Signal::Buy, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();
        trader
            .execute(Signal::Buy, 3_000.0, "ETHUSDT", &journal, now())
            .unwrap();
        assert_eq!(trader.portfolio.position_count(), 2);

        trader
            .execute(Signal::Sell, 51_000.0, "BTCUSDT", &journal, now())
            .unwrap();
        assert!(!trader.portfolio.has_position("BTCUSDT"));
        let eth = trader.portfolio.get_position("ETHUSDT").unwrap();
        assert_relative_eq!(eth.entry_price, 3_000.0);
    }

    #[test]
    fn journal_failure_leaves_state_untouched() {
        let journal = MemoryJournal::failing();
        let mut trader = trader();
        // Open against a working journal path (opens do not write).
        trader
            .execute(Signal::Buy, 50_000.0, "BTCUSDT", &journal, now())
            .unwrap();
        let balance_before = trader.portfolio.balance;

        let result = trader.execute(Signal::Sell, 49_000.0, "BTCUSDT", &journal, now());

        assert!(matches!(result, Err(KestrelError::Journal { .. })));
        assert!(trader.portfolio.has_position("BTCUSDT"));
        assert_relative_eq!(trader.portfolio.balance, balance_before);
        assert_eq!(trader.breaker.state().consecutive_losses, 0);
    }

    #[test]
    fn corrupt_entry_price_fails_fast() {
        let journal = MemoryJournal::new();
        let mut trader = trader();
        trader.portfolio.add_position(Position {
            symbol: "BTCUSDT".into(),
            side: Side::Buy,
            entry_price: 0.0,
            size_usd: 100.0,
        });

        let result = trader.execute(Signal::Sell, 50_000.0, "BTCUSDT", &journal, now());
        assert!(matches!(result, Err(KestrelError::InvalidPosition { .. })));
    }
}
