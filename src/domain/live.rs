//! One live rebalancing cycle against a broker.
//!
//! Sequence: gate check, fetch, evaluate, cancel open orders, settle, diff
//! against broker holdings, submit sells, settle, then submit buys one at a
//! time with buying power re-queried before each. The gate is marked only
//! after every submission succeeded; any collaborator error aborts the cycle.

use crate::domain::config::EngineConfig;
use crate::domain::engine::{DecisionEngine, Evaluation};
use crate::domain::error::TacticianError;
use crate::domain::rebalance::{RebalanceParams, TradeInstruction, cap_to_buying_power, plan_rebalance};
use crate::ports::broker_port::AccountPort;
use crate::ports::data_port::PriceProvider;
use crate::ports::gate_port::RunGate;
use chrono::NaiveDate;
use log::{debug, info};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum LiveCycleOutcome {
    AlreadyRan(NaiveDate),
    Executed {
        evaluation: Evaluation,
        submitted: Vec<TradeInstruction>,
    },
}

pub struct LiveTrader {
    engine: DecisionEngine,
    rebalance: RebalanceParams,
    benchmark: String,
    cash_symbol: String,
    settle: Duration,
}

impl LiveTrader {
    pub fn from_config(config: &EngineConfig) -> Self {
        LiveTrader {
            engine: DecisionEngine::from_config(config),
            rebalance: config.rebalance.clone(),
            benchmark: config.universe.benchmark.clone(),
            cash_symbol: config.universe.cash_symbol.clone(),
            settle: Duration::from_millis(config.rebalance.settle_millis),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn pause(&self) {
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
    }
}

pub fn run_live_cycle(
    today: NaiveDate,
    trader: &LiveTrader,
    provider: &dyn PriceProvider,
    account: &mut dyn AccountPort,
    gate: &mut dyn RunGate,
) -> Result<LiveCycleOutcome, TacticianError> {
    if gate.already_ran(today)? {
        info!("{today}: cycle already ran, nothing to do");
        return Ok(LiveCycleOutcome::AlreadyRan(today));
    }

    let panel = provider.get_panel(Some(today))?;
    let view = panel.latest().ok_or_else(|| TacticianError::NoData {
        ticker: trader.benchmark.clone(),
    })?;
    let evaluation = trader.engine.evaluate(&view);

    let cancelled = account.cancel_open_orders()?;
    if cancelled > 0 {
        info!("cancelled {cancelled} open orders");
    }
    trader.pause();

    let holdings = account.current()?;
    let equity = account.equity()?;
    let prices = view.latest_prices();
    let plan = plan_rebalance(
        &holdings,
        &evaluation.target,
        equity,
        &prices,
        &trader.rebalance,
        &trader.cash_symbol,
    );

    let mut submitted = Vec::with_capacity(plan.len());
    for sell in &plan.sells {
        info!("SELL {} {:.2}", sell.ticker, sell.notional());
        account.submit(&sell.ticker, sell.signed_notional, sell.side)?;
        submitted.push(sell.clone());
    }

    if !plan.buys.is_empty() {
        trader.pause();
    }

    let p = &trader.rebalance;
    for buy in &plan.buys {
        let buying_power = account.buying_power()?;
        let notional = cap_to_buying_power(buy.signed_notional, buying_power, p.buying_power_haircut);
        if notional < p.min_buy || notional < p.min_order {
            debug!("{}: buy {notional:.2} below floor after cap", buy.ticker);
            continue;
        }
        info!("BUY {} {:.2}", buy.ticker, notional);
        account.submit(&buy.ticker, notional, buy.side)?;
        submitted.push(TradeInstruction {
            signed_notional: notional,
            ..buy.clone()
        });
    }

    gate.mark_done(today)?;
    Ok(LiveCycleOutcome::Executed {
        evaluation,
        submitted,
    })
}
