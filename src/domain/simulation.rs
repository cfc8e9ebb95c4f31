//! Walk-forward historical replay.
//!
//! Each step hands the engine a view ending at that day, diffs the result
//! against the prior day's ledger at that day's closes, fills every
//! instruction at the close and records equity. The ledger is the only state
//! carried between steps.

use crate::domain::config::EngineConfig;
use crate::domain::engine::DecisionEngine;
use crate::domain::error::TacticianError;
use crate::domain::ledger::{DUST_QUANTITY, Ledger};
use crate::domain::price_panel::PricePanel;
use crate::domain::rebalance::{RebalanceParams, Side, plan_rebalance};
use crate::domain::regime::Regime;
use chrono::NaiveDate;
use log::{debug, info};

const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Rows skipped before the first evaluation.
    pub warmup: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 10_000.0,
            warmup: 252,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub regime: Regime,
    pub benchmark_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedTrade {
    pub date: NaiveDate,
    pub ticker: String,
    pub side: Side,
    pub notional: f64,
    pub quantity: f64,
    pub price: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub points: Vec<SimulationPoint>,
    pub trades: Vec<ExecutedTrade>,
    pub ledger: Ledger,
    pub total_cost: f64,
}

impl SimulationResult {
    pub fn final_equity(&self) -> f64 {
        self.points
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.ledger.initial_capital)
    }

    pub fn regime_days(&self, regime: Regime) -> usize {
        self.points.iter().filter(|p| p.regime == regime).count()
    }
}

pub struct SimulationDriver {
    engine: DecisionEngine,
    rebalance: RebalanceParams,
    benchmark: String,
    cash_symbol: String,
    config: SimulationConfig,
}

impl SimulationDriver {
    pub fn new(engine_config: &EngineConfig, config: SimulationConfig) -> Self {
        SimulationDriver {
            engine: DecisionEngine::from_config(engine_config),
            rebalance: engine_config.rebalance.clone(),
            benchmark: engine_config.universe.benchmark.clone(),
            cash_symbol: engine_config.universe.cash_symbol.clone(),
            config,
        }
    }

    /// Replay `panel` from the first evaluable row to the last.
    pub fn run(&self, panel: &PricePanel) -> Result<SimulationResult, TacticianError> {
        let (first, last) = self.step_range(panel)?;
        let mut ledger = Ledger::new(self.config.initial_capital);
        let mut points = Vec::with_capacity(last + 1 - first);
        let mut trades = Vec::new();
        let mut total_cost = 0.0;

        info!(
            "simulating {} steps from {} to {}",
            last + 1 - first,
            panel.dates()[first],
            panel.dates()[last]
        );

        for index in first..=last {
            let Some(view) = panel.view_through(index) else {
                break;
            };
            let evaluation = self.engine.evaluate(&view);
            let prices = view.latest_prices();

            let holdings = ledger.holdings(&prices);
            let equity = ledger.equity(&prices);
            let plan = plan_rebalance(
                &holdings,
                &evaluation.target,
                equity,
                &prices,
                &self.rebalance,
                &self.cash_symbol,
            );

            for instruction in plan.instructions() {
                let Some(&price) = prices.get(&instruction.ticker) else {
                    continue;
                };
                let quantity = ledger.apply(instruction, price)?;
                total_cost += instruction.estimated_cost;
                trades.push(ExecutedTrade {
                    date: view.date(),
                    ticker: instruction.ticker.clone(),
                    side: instruction.side,
                    notional: instruction.notional(),
                    quantity,
                    price,
                    cost: instruction.estimated_cost,
                });
            }

            let purged = ledger.purge_dust(DUST_QUANTITY);
            if !purged.is_empty() {
                debug!("{}: purged dust {:?}", view.date(), purged);
            }

            let point = SimulationPoint {
                date: view.date(),
                equity: ledger.equity(&prices),
                cash: ledger.cash,
                regime: evaluation.decision.regime,
                benchmark_price: view.last_close(&self.benchmark),
            };
            if (index - first) % PROGRESS_EVERY == 0 {
                info!(
                    "{}: equity {:.2} [{}], {} positions",
                    point.date,
                    point.equity,
                    point.regime,
                    ledger.position_count()
                );
            }
            points.push(point);
        }

        Ok(SimulationResult {
            points,
            trades,
            ledger,
            total_cost,
        })
    }

    /// Inclusive row range to evaluate: after warm-up and inside the
    /// configured date window.
    fn step_range(&self, panel: &PricePanel) -> Result<(usize, usize), TacticianError> {
        if panel.is_empty() {
            return Err(TacticianError::NoData {
                ticker: self.benchmark.clone(),
            });
        }
        if panel.len() <= self.config.warmup {
            return Err(TacticianError::InsufficientData {
                ticker: self.benchmark.clone(),
                bars: panel.len(),
                minimum: self.config.warmup + 1,
            });
        }

        let dates = panel.dates();
        let first = self
            .config
            .start_date
            .map(|d| dates.partition_point(|x| *x < d))
            .unwrap_or(0)
            .max(self.config.warmup);
        let end = self
            .config
            .end_date
            .map(|d| dates.partition_point(|x| *x <= d))
            .unwrap_or(dates.len());

        if first >= end {
            return Err(TacticianError::InsufficientData {
                ticker: self.benchmark.clone(),
                bars: end.saturating_sub(first),
                minimum: 1,
            });
        }
        Ok((first, end - 1))
    }
}
