//! Loss-streak circuit breaker.
//!
//! Trading halts once `max_losses` consecutive losing closes accumulate,
//! for `cooldown_hours` of wall-clock time. The gate is global: one
//! breaker guards every symbol.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Durable breaker counters, persisted in the journal between runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub consecutive_losses: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitBreakerState,
    max_losses: u32,
    cooldown_hours: i64,
}

impl CircuitBreaker {
    pub fn new(max_losses: u32, cooldown_hours: i64) -> CircuitBreaker {
        CircuitBreaker::with_state(CircuitBreakerState::default(), max_losses, cooldown_hours)
    }

    /// Rebuild from journal state so a restart keeps the streak and cooldown.
    pub fn with_state(
        state: CircuitBreakerState,
        max_losses: u32,
        cooldown_hours: i64,
    ) -> CircuitBreaker {
        CircuitBreaker {
            state,
            max_losses,
            cooldown_hours,
        }
    }

    pub fn state(&self) -> &CircuitBreakerState {
        &self.state
    }

    /// Whether any trade may execute at `now`. An active cooldown and a
    /// not-yet-reset loss streak block independently.
    pub fn is_allowed(&self, now: DateTime<Utc>) -> bool {
        if self.is_on_cooldown(now) {
            return false;
        }
        self.state.consecutive_losses < self.max_losses
    }

    /// Lazy cooldown check: the window simply stops blocking once
    /// wall-clock time passes it.
    pub fn is_on_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.state.cooldown_until {
            Some(until) => now < until,
            None => false,
        }
    }

    /// The state the breaker moves to when a close with `pnl` lands at
    /// `now`. A loss extends the streak and arms the cooldown at the
    /// limit; a win or break-even resets the streak whatever the current
    /// state.
    pub fn after_close(&self, pnl: f64, now: DateTime<Utc>) -> CircuitBreakerState {
        let mut next = self.state.clone();
        if pnl < 0.0 {
            next.consecutive_losses += 1;
            if next.consecutive_losses >= self.max_losses {
                next.cooldown_until = Some(now + Duration::hours(self.cooldown_hours));
            }
        } else {
            next.consecutive_losses = 0;
        }
        next
    }

    /// Adopt a state that has already been persisted.
    pub fn apply(&mut self, state: CircuitBreakerState) {
        self.state = state;
    }

    /// Manual reset: clear the streak and the cooldown.
    pub fn reset(&mut self) {
        self.state = CircuitBreakerState::default();
    }
}
