//! Portfolio construction: candidate ranking and volatility-targeted sizing.
//!
//! ATTACK: score every eligible candidate by `lookback return / volatility`,
//! keep the top `slots`, size each slot at `(1 / slots) * target_vol / vol`,
//! boost breakouts, clamp to the per-line ceiling. If the clamped weights sum
//! above 1 they are then scaled down proportionally. The unallocated
//! remainder is cash and is never instructed.
//!
//! DEFENSE: a single line at weight 1.0 in the refuge chosen by the regime
//! classifier.

use crate::domain::price_panel::PanelView;
use crate::domain::regime::{Regime, RegimeDecision};
use crate::domain::signal::{annualized_volatility, average_true_range, lookback_return, rolling_max};
use crate::domain::universe::AssetUniverse;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationParams {
    pub lookback: usize,
    pub volatility_window: usize,
    pub slots: usize,
    pub target_volatility: f64,
    pub max_weight: f64,
    pub breakout_window: usize,
    pub breakout_threshold: f64,
    pub breakout_boost: f64,
    pub atr_window: usize,
}

impl Default for AllocationParams {
    fn default() -> Self {
        AllocationParams {
            lookback: 126,
            volatility_window: 20,
            slots: 3,
            target_volatility: 0.25,
            max_weight: 0.40,
            breakout_window: 20,
            breakout_threshold: 0.98,
            breakout_boost: 1.2,
            atr_window: 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RationaleTag {
    Breakout,
    TrendFollow,
    Defensive,
}

impl fmt::Display for RationaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RationaleTag::Breakout => write!(f, "BREAKOUT"),
            RationaleTag::TrendFollow => write!(f, "TREND"),
            RationaleTag::Defensive => write!(f, "DEFENSIVE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetLine {
    pub ticker: String,
    pub weight: f64,
    pub rationale: RationaleTag,
    pub score: f64,
    pub volatility: f64,
    pub atr: f64,
}

/// Ordered target lines; Σweight ≤ 1, the remainder is implicit cash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioTarget {
    pub lines: Vec<TargetLine>,
}

impl PortfolioTarget {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.lines.iter().map(|l| l.weight).sum()
    }

    pub fn weight_of(&self, ticker: &str) -> Option<f64> {
        self.lines.iter().find(|l| l.ticker == ticker).map(|l| l.weight)
    }

    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.lines.iter().map(|l| (l.ticker.clone(), l.weight)).collect()
    }
}

/// A candidate that passed scoring, before sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub ticker: String,
    pub score: f64,
    pub volatility: f64,
    pub price: f64,
    /// Highest close of the breakout window, if enough history.
    pub recent_high: Option<f64>,
    pub atr: f64,
}

impl ScoredCandidate {
    fn is_breakout(&self, threshold: f64) -> bool {
        self.recent_high.is_some_and(|high| self.price >= high * threshold)
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioConstructor {
    params: AllocationParams,
    candidates: Vec<String>,
}

impl PortfolioConstructor {
    pub fn new(params: AllocationParams, universe: &AssetUniverse) -> Self {
        PortfolioConstructor {
            params,
            candidates: universe.attack_candidates(),
        }
    }

    pub fn construct(&self, decision: &RegimeDecision, view: &PanelView<'_>) -> PortfolioTarget {
        let target = match decision.regime {
            Regime::Attack => self.size_candidates(self.score_candidates(view)),
            Regime::Defense => match &decision.defense_asset {
                Some(asset) => defense_target(asset),
                None => {
                    warn!("DEFENSE decision without a refuge asset, holding cash");
                    PortfolioTarget::default()
                }
            },
        };

        if target.is_empty() {
            info!("{}: no target lines, holding cash", view.date());
        }
        for line in &target.lines {
            info!(
                "{}: target {} {:.1}% [{}]",
                view.date(),
                line.ticker,
                line.weight * 100.0,
                line.rationale
            );
        }
        target
    }

    /// Score and rank candidates, best first. Equal scores keep scan order.
    pub fn score_candidates(&self, view: &PanelView<'_>) -> Vec<ScoredCandidate> {
        let p = &self.params;
        let mut scored = Vec::new();

        for ticker in &self.candidates {
            let (Some(closes), Some(price)) = (view.closes(ticker), view.last_close(ticker)) else {
                warn!("{}: no usable price for {ticker}, excluded", view.date());
                continue;
            };
            let Some(ret) = lookback_return(closes, p.lookback) else {
                debug!("{ticker}: fewer than {} closes, excluded", p.lookback + 1);
                continue;
            };
            let volatility = annualized_volatility(closes, p.volatility_window);
            if volatility <= 0.0 {
                debug!("{ticker}: no volatility, excluded");
                continue;
            }
            let score = ret / volatility;
            if !(score > 0.0) {
                continue;
            }

            let atr = match (view.highs(ticker), view.lows(ticker)) {
                (Some(highs), Some(lows)) => average_true_range(highs, lows, closes, p.atr_window),
                _ => 0.0,
            };

            scored.push(ScoredCandidate {
                ticker: ticker.clone(),
                score,
                volatility,
                price,
                recent_high: rolling_max(closes, p.breakout_window),
                atr,
            });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored
    }

    /// Size the first `slots` ranked candidates.
    pub fn size_candidates(&self, ranked: Vec<ScoredCandidate>) -> PortfolioTarget {
        let p = &self.params;
        let mut lines: Vec<TargetLine> = ranked
            .into_iter()
            .take(p.slots)
            .map(|c| {
                let breakout = c.is_breakout(p.breakout_threshold);
                TargetLine {
                    weight: self.slot_weight(c.volatility, breakout),
                    rationale: if breakout {
                        RationaleTag::Breakout
                    } else {
                        RationaleTag::TrendFollow
                    },
                    ticker: c.ticker,
                    score: c.score,
                    volatility: c.volatility,
                    atr: c.atr,
                }
            })
            .collect();

        let total: f64 = lines.iter().map(|l| l.weight).sum();
        if total > 1.0 {
            debug!("clamped weights sum to {total:.4}, scaling to 1");
            for line in &mut lines {
                line.weight /= total;
            }
        }

        PortfolioTarget { lines }
    }

    /// `(1 / slots) * target_vol / vol`, boosted on breakout, capped.
    pub fn slot_weight(&self, volatility: f64, breakout: bool) -> f64 {
        let p = &self.params;
        if volatility <= 0.0 || p.slots == 0 {
            return 0.0;
        }
        let mut weight = (1.0 / p.slots as f64) * (p.target_volatility / volatility);
        if breakout {
            weight *= p.breakout_boost;
        }
        weight.min(p.max_weight)
    }
}

fn defense_target(asset: &str) -> PortfolioTarget {
    PortfolioTarget {
        lines: vec![TargetLine {
            ticker: asset.to_string(),
            weight: 1.0,
            rationale: RationaleTag::Defensive,
            score: 0.0,
            volatility: 0.0,
            atr: 0.0,
        }],
    }
}
