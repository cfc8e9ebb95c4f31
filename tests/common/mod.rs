#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tactician::domain::config::EngineConfig;
use tactician::domain::error::TacticianError;
pub use tactician::domain::ohlcv::OhlcvBar;
use tactician::domain::price_panel::PricePanel;
use tactician::domain::rebalance::{Holdings, Side};
use tactician::domain::universe::AssetUniverse;
use tactician::ports::broker_port::{AccountPort, HoldingsProvider, OrderSink};
use tactician::ports::data_port::PriceProvider;
use tactician::ports::gate_port::RunGate;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    start_date() + chrono::Duration::days(i as i64)
}

pub fn bars_from_closes(ticker: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| OhlcvBar::from_close(ticker, day(i), c))
        .collect()
}

/// Closes compounding at `drift` per day with alternating `noise` shocks.
pub fn trending(n: usize, drift: f64, noise: f64) -> Vec<f64> {
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let shock = if i % 2 == 0 { noise } else { -noise };
            price *= 1.0 + drift + shock;
            price
        })
        .collect()
}

pub fn panel_from(series: &[(&str, Vec<f64>)]) -> PricePanel {
    let bars = series
        .iter()
        .map(|(t, closes)| (t.to_string(), bars_from_closes(t, closes)))
        .collect::<BTreeMap<_, _>>();
    PricePanel::from_bars(bars)
}

/// Small universe: SPY benchmark, GLD/IEF refuges, three growth names.
pub fn small_universe() -> AssetUniverse {
    AssetUniverse {
        benchmark: "SPY".into(),
        canaries: vec!["EEM".into()],
        defense: vec!["IEF".into(), "GLD".into()],
        growth: vec!["AAA".into(), "BBB".into(), "CCC".into()],
        sectors: vec![],
        cash_symbol: "BIL".into(),
        cash_equivalents: vec!["BIL".into(), "IEF".into()],
    }
}

pub fn small_config() -> EngineConfig {
    EngineConfig {
        universe: small_universe(),
        ..EngineConfig::default()
    }
}

/// Benchmark rises for the first 70% of `n` days then declines, so a run
/// starting after a 252-day warm-up visits both regimes when `n` is ~500.
pub fn two_regime_series(n: usize) -> Vec<(&'static str, Vec<f64>)> {
    let bull = n * 7 / 10;
    let mut spy = trending(bull, 0.002, 0.005);
    let mut last = *spy.last().unwrap();
    for i in 0..(n - bull) {
        last *= 1.0 - 0.004 + if i % 2 == 0 { 0.003 } else { -0.003 };
        spy.push(last);
    }
    vec![
        ("SPY", spy),
        ("EEM", trending(n, 0.0005, 0.01)),
        ("GLD", trending(n, 0.0008, 0.004)),
        ("IEF", trending(n, 0.0002, 0.002)),
        ("AAA", trending(n, 0.003, 0.012)),
        ("BBB", trending(n, 0.002, 0.015)),
        ("CCC", trending(n, -0.001, 0.01)),
    ]
}

pub struct MockPriceProvider {
    pub bars: BTreeMap<String, Vec<OhlcvBar>>,
    pub error: Option<String>,
}

impl MockPriceProvider {
    pub fn new() -> Self {
        Self {
            bars: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_closes(mut self, ticker: &str, closes: &[f64]) -> Self {
        self.bars.insert(ticker.to_string(), bars_from_closes(ticker, closes));
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl PriceProvider for MockPriceProvider {
    fn get_panel(&self, as_of: Option<NaiveDate>) -> Result<PricePanel, TacticianError> {
        if let Some(reason) = &self.error {
            return Err(TacticianError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self
            .bars
            .iter()
            .map(|(t, b)| {
                let kept: Vec<OhlcvBar> = b
                    .iter()
                    .filter(|bar| as_of.is_none_or(|d| bar.date <= d))
                    .cloned()
                    .collect();
                (t.clone(), kept)
            })
            .collect();
        Ok(PricePanel::from_bars(bars))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Cancel,
    Submit(String, f64, Side),
}

/// Records every call; fills nothing. Buying power and failures are scripted.
pub struct MockBroker {
    pub holdings: Holdings,
    pub equity: f64,
    pub buying_power: f64,
    pub open_orders: usize,
    pub calls: Vec<BrokerCall>,
    pub reject: BTreeSet<String>,
}

impl MockBroker {
    pub fn new(equity: f64, holdings: Holdings) -> Self {
        Self {
            holdings,
            equity,
            buying_power: equity,
            open_orders: 0,
            calls: Vec::new(),
            reject: BTreeSet::new(),
        }
    }

    pub fn with_buying_power(mut self, buying_power: f64) -> Self {
        self.buying_power = buying_power;
        self
    }

    pub fn rejecting(mut self, ticker: &str) -> Self {
        self.reject.insert(ticker.to_string());
        self
    }

    pub fn submissions(&self) -> Vec<(String, f64, Side)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Submit(t, n, s) => Some((t.clone(), *n, *s)),
                _ => None,
            })
            .collect()
    }
}

impl HoldingsProvider for MockBroker {
    fn current(&self) -> Result<Holdings, TacticianError> {
        Ok(self.holdings.clone())
    }
}

impl OrderSink for MockBroker {
    fn submit(&mut self, ticker: &str, notional: f64, side: Side) -> Result<(), TacticianError> {
        if self.reject.contains(ticker) {
            return Err(TacticianError::Broker {
                reason: format!("{ticker} rejected"),
            });
        }
        self.calls.push(BrokerCall::Submit(ticker.to_string(), notional, side));
        Ok(())
    }
}

impl AccountPort for MockBroker {
    fn equity(&self) -> Result<f64, TacticianError> {
        Ok(self.equity)
    }

    fn buying_power(&self) -> Result<f64, TacticianError> {
        Ok(self.buying_power)
    }

    fn cancel_open_orders(&mut self) -> Result<usize, TacticianError> {
        self.calls.push(BrokerCall::Cancel);
        Ok(std::mem::take(&mut self.open_orders))
    }
}

#[derive(Default)]
pub struct MemoryGate {
    pub done: BTreeSet<NaiveDate>,
}

impl RunGate for MemoryGate {
    fn already_ran(&self, date: NaiveDate) -> Result<bool, TacticianError> {
        Ok(self.done.contains(&date))
    }

    fn mark_done(&mut self, date: NaiveDate) -> Result<(), TacticianError> {
        self.done.insert(date);
        Ok(())
    }
}
