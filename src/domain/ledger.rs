//! Virtual cash and quantity ledger used by the simulation driver.

use crate::domain::error::TacticianError;
use crate::domain::rebalance::{Holdings, TradeInstruction};
use std::collections::BTreeMap;

/// Quantities below this are purged after each step.
pub const DUST_QUANTITY: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub cash: f64,
    pub initial_capital: f64,
    /// Ticker to fractional quantity.
    pub positions: BTreeMap<String, f64>,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
        }
    }

    pub fn quantity(&self, ticker: &str) -> f64 {
        self.positions.get(ticker).copied().unwrap_or(0.0)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Market value of every priced position.
    pub fn holdings(&self, prices: &BTreeMap<String, f64>) -> Holdings {
        self.positions
            .iter()
            .filter_map(|(t, qty)| prices.get(t).map(|p| (t.clone(), qty * p)))
            .collect()
    }

    /// `cash + Σ quantity × price`.
    pub fn equity(&self, prices: &BTreeMap<String, f64>) -> f64 {
        self.cash + self.holdings(prices).values().sum::<f64>()
    }

    /// Fill `instruction` at `price`; returns the quantity change.
    pub fn apply(&mut self, instruction: &TradeInstruction, price: f64) -> Result<f64, TacticianError> {
        if !(price.is_finite() && price > 0.0) {
            return Err(TacticianError::Data {
                reason: format!("cannot fill {} at price {price}", instruction.ticker),
            });
        }
        let delta = instruction.signed_notional / price;
        *self.positions.entry(instruction.ticker.clone()).or_insert(0.0) += delta;
        self.cash -= instruction.signed_notional + instruction.estimated_cost;
        Ok(delta)
    }

    /// Drop positions whose absolute quantity is below `min_quantity`.
    pub fn purge_dust(&mut self, min_quantity: f64) -> Vec<String> {
        let dust: Vec<String> = self
            .positions
            .iter()
            .filter(|(_, q)| q.abs() < min_quantity)
            .map(|(t, _)| t.clone())
            .collect();
        for ticker in &dust {
            self.positions.remove(ticker);
        }
        dust
    }
}
