//! Two-state market regime classification.
//!
//! ATTACK when the benchmark's close is strictly above its trailing SMA
//! (current close included), DEFENSE otherwise. Memoryless: every call looks
//! only at the view it is given, so single-day flips across the average are
//! expected. Not enough benchmark history falls back to ATTACK.

use crate::domain::price_panel::PanelView;
use crate::domain::signal::{
    MomentumParams, momentum_score, simple_moving_average, simple_return, trend_distance,
};
use crate::domain::universe::AssetUniverse;
use log::{debug, info, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    Attack,
    Defense,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Attack => write!(f, "ATTACK"),
            Regime::Defense => write!(f, "DEFENSE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeDecision {
    pub regime: Regime,
    /// Set only in DEFENSE.
    pub defense_asset: Option<String>,
    /// `price / SMA - 1`, observability only.
    pub trend_distance: f64,
    /// Weighted momentum of each canary, observability only.
    pub canary_momentum: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeParams {
    pub trend_window: usize,
    pub defense_lookback: usize,
}

impl Default for RegimeParams {
    fn default() -> Self {
        RegimeParams {
            trend_window: 200,
            defense_lookback: 63,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    params: RegimeParams,
    momentum: MomentumParams,
    benchmark: String,
    canaries: Vec<String>,
    defense: Vec<String>,
    cash_symbol: String,
}

impl RegimeClassifier {
    pub fn new(params: RegimeParams, momentum: MomentumParams, universe: &AssetUniverse) -> Self {
        RegimeClassifier {
            params,
            momentum,
            benchmark: universe.benchmark.clone(),
            canaries: universe.canaries.clone(),
            defense: universe.defense.clone(),
            cash_symbol: universe.cash_symbol.clone(),
        }
    }

    pub fn classify(&self, view: &PanelView<'_>) -> RegimeDecision {
        let (regime, distance) = self.trend_state(view);

        let canary_momentum = self
            .canaries
            .iter()
            .filter_map(|t| {
                view.closes(t)
                    .map(|c| (t.clone(), momentum_score(c, &self.momentum)))
            })
            .collect();

        let defense_asset = match regime {
            Regime::Attack => None,
            Regime::Defense => Some(self.best_defense_asset(view)),
        };

        info!(
            "{}: regime {} ({:+.2}% vs SMA{}){}",
            view.date(),
            regime,
            distance * 100.0,
            self.params.trend_window,
            defense_asset
                .as_deref()
                .map(|a| format!(", refuge {a}"))
                .unwrap_or_default()
        );

        RegimeDecision {
            regime,
            defense_asset,
            trend_distance: distance,
            canary_momentum,
        }
    }

    fn trend_state(&self, view: &PanelView<'_>) -> (Regime, f64) {
        let Some(closes) = view.closes(&self.benchmark) else {
            warn!("benchmark {} missing from panel, defaulting to ATTACK", self.benchmark);
            return (Regime::Attack, 0.0);
        };
        if closes.len() <= self.params.trend_window {
            debug!(
                "benchmark has {} closes, need more than {}; defaulting to ATTACK",
                closes.len(),
                self.params.trend_window
            );
            return (Regime::Attack, 0.0);
        }

        let (Some(price), Some(sma)) = (
            view.last_close(&self.benchmark),
            simple_moving_average(closes, self.params.trend_window),
        ) else {
            return (Regime::Attack, 0.0);
        };

        let distance = trend_distance(price, sma);
        if price > sma {
            (Regime::Attack, distance)
        } else {
            (Regime::Defense, distance)
        }
    }

    /// Highest short-momentum defensive asset; first in scan order wins ties.
    fn best_defense_asset(&self, view: &PanelView<'_>) -> String {
        let lookback = self.params.defense_lookback;
        let mut best: Option<(&str, f64)> = None;

        for asset in &self.defense {
            let Some(closes) = view.closes(asset) else {
                continue;
            };
            if closes.len() <= lookback {
                continue;
            }
            let Some(score) = simple_return(closes, lookback) else {
                continue;
            };
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((asset, score));
            }
        }

        match best {
            Some((asset, _)) => asset.to_string(),
            None => {
                warn!(
                    "no defensive asset has more than {lookback} closes, falling back to {}",
                    self.cash_symbol
                );
                self.cash_symbol.clone()
            }
        }
    }
}
