//! Multi-asset paper portfolio.

use std::collections::HashMap;

use super::position::Position;

/// Cash balance plus at most one open position per symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub balance: f64,
    pub initial_balance: f64,
    positions: HashMap<String, Position>,
}

impl Portfolio {
    pub fn new(initial_balance: f64) -> Portfolio {
        Portfolio {
            balance: initial_balance,
            initial_balance,
            positions: HashMap::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn remove_position(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Symbols with an open position, sorted for deterministic iteration.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.positions.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Total USD currently deployed into open positions.
    pub fn open_exposure(&self) -> f64 {
        self.positions.values().map(|p| p.size_usd).sum()
    }
}
