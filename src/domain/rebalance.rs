//! Target-weight to trade-instruction diffing.
//!
//! Produces two ordered phases, sells then buys, so sale proceeds are
//! available before purchases. Drift inside the tolerance band is left alone.

use crate::domain::allocation::PortfolioTarget;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Ticker to current market value.
pub type Holdings = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceParams {
    /// Minimum drift, as a fraction of equity, before a trade is issued.
    pub tolerance: f64,
    pub cost_rate: f64,
    /// Buys below this notional are skipped.
    pub min_buy: f64,
    /// No instruction below this notional is submitted.
    pub min_order: f64,
    pub buying_power_haircut: f64,
    /// Live-mode pause after cancelling and after the sell phase.
    pub settle_millis: u64,
}

impl Default for RebalanceParams {
    fn default() -> Self {
        RebalanceParams {
            tolerance: 0.05,
            cost_rate: 0.001,
            min_buy: 10.0,
            min_order: 1.0,
            buying_power_haircut: 0.95,
            settle_millis: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeInstruction {
    pub ticker: String,
    /// Positive for buys, negative for sells.
    pub signed_notional: f64,
    pub side: Side,
    pub estimated_cost: f64,
}

impl TradeInstruction {
    pub fn notional(&self) -> f64 {
        self.signed_notional.abs()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebalancePlan {
    pub sells: Vec<TradeInstruction>,
    pub buys: Vec<TradeInstruction>,
}

impl RebalancePlan {
    /// Every instruction, sells first.
    pub fn instructions(&self) -> impl Iterator<Item = &TradeInstruction> {
        self.sells.iter().chain(self.buys.iter())
    }

    pub fn len(&self) -> usize {
        self.sells.len() + self.buys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sells.is_empty() && self.buys.is_empty()
    }

    pub fn total_cost(&self) -> f64 {
        self.instructions().map(|i| i.estimated_cost).sum()
    }
}

/// Diff `holdings` against `target` at `equity`.
///
/// Held tickers absent from the target are fully exited, except the cash
/// symbol which is never traded. Tickers without a usable price are skipped.
/// Within each phase instructions are sorted by ticker.
pub fn plan_rebalance(
    holdings: &Holdings,
    target: &PortfolioTarget,
    equity: f64,
    prices: &BTreeMap<String, f64>,
    params: &RebalanceParams,
    cash_symbol: &str,
) -> RebalancePlan {
    let mut plan = RebalancePlan::default();
    if !(equity > 0.0) {
        warn!("equity {equity:.2} is not positive, nothing to rebalance");
        return plan;
    }

    let weights = target.weights();
    let tickers: BTreeSet<&String> = holdings.keys().chain(weights.keys()).collect();
    let band = params.tolerance * equity;

    for ticker in tickers {
        if ticker == cash_symbol {
            continue;
        }
        if !prices.get(ticker).is_some_and(|p| p.is_finite() && *p > 0.0) {
            warn!("no usable price for {ticker}, skipping");
            continue;
        }

        let current = holdings.get(ticker).copied().unwrap_or(0.0);
        let desired = weights.get(ticker).copied().unwrap_or(0.0) * equity;
        let diff = desired - current;

        if diff.abs() <= band {
            debug!("{ticker}: drift {diff:.2} inside band {band:.2}");
            continue;
        }

        let cost = diff.abs() * params.cost_rate;
        if diff < 0.0 {
            if diff.abs() < params.min_order {
                continue;
            }
            plan.sells.push(TradeInstruction {
                ticker: ticker.clone(),
                signed_notional: diff,
                side: Side::Sell,
                estimated_cost: cost,
            });
        } else {
            let notional = diff * (1.0 - params.cost_rate);
            if notional < params.min_buy || notional < params.min_order {
                debug!("{ticker}: buy {notional:.2} below floor");
                continue;
            }
            plan.buys.push(TradeInstruction {
                ticker: ticker.clone(),
                signed_notional: notional,
                side: Side::Buy,
                estimated_cost: cost,
            });
        }
    }

    plan
}

/// Clamp a buy to available buying power, keeping a safety margin when the
/// request exceeds it.
pub fn cap_to_buying_power(notional: f64, buying_power: f64, haircut: f64) -> f64 {
    if notional > buying_power {
        let capped = (buying_power * haircut).max(0.0);
        warn!("buy {notional:.2} exceeds buying power {buying_power:.2}, capped to {capped:.2}");
        capped
    } else {
        notional
    }
}
