//! End-to-end tests across the engine, simulation driver and live cycle.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use std::collections::BTreeMap;
use std::time::Duration;
use tactician::domain::allocation::{AllocationParams, PortfolioConstructor, PortfolioTarget, RationaleTag, ScoredCandidate, TargetLine};
use tactician::domain::engine::DecisionEngine;
use tactician::domain::error::TacticianError;
use tactician::domain::live::{LiveCycleOutcome, LiveTrader, run_live_cycle};
use tactician::domain::metrics::Metrics;
use tactician::domain::price_panel::PricePanel;
use tactician::domain::rebalance::{Holdings, RebalanceParams, Side, plan_rebalance};
use tactician::domain::regime::{Regime, RegimeClassifier, RegimeParams};
use tactician::domain::signal::MomentumParams;
use tactician::domain::simulation::{SimulationConfig, SimulationDriver};
use tactician::domain::universe::AssetUniverse;

/// 200 closes at `base` then `last`, where `base` is chosen so the
/// 200-day SMA including `last` equals `sma`.
fn benchmark_with_sma(last: f64, sma: f64) -> Vec<f64> {
    let base = (sma * 200.0 - last) / 199.0;
    let mut closes = vec![base; 200];
    closes.push(last);
    closes
}

/// 201 flat closes whose 63-day simple return is `ret`.
fn with_63_day_return(ret: f64) -> Vec<f64> {
    let mut closes = vec![100.0; 201];
    closes[201 - 63] = 100.0 / (1.0 + ret);
    closes
}

fn classifier(defense: &[&str]) -> RegimeClassifier {
    let universe = AssetUniverse {
        defense: defense.iter().map(|t| t.to_string()).collect(),
        ..small_universe()
    };
    RegimeClassifier::new(RegimeParams::default(), MomentumParams::default(), &universe)
}

mod scenarios {
    use super::*;

    #[test]
    fn price_above_sma_is_attack() {
        let panel = panel_from(&[("SPY", benchmark_with_sma(100.0, 95.0))]);
        let decision = classifier(&["A", "B"]).classify(&panel.latest().unwrap());
        assert_eq!(decision.regime, Regime::Attack);
        assert_abs_diff_eq!(decision.trend_distance, 100.0 / 95.0 - 1.0, epsilon = 1e-9);
        assert!(decision.defense_asset.is_none());
    }

    #[test]
    fn price_below_sma_picks_strongest_refuge() {
        let panel = panel_from(&[
            ("SPY", benchmark_with_sma(90.0, 95.0)),
            ("A", with_63_day_return(0.02)),
            ("B", with_63_day_return(0.05)),
        ]);
        let decision = classifier(&["A", "B"]).classify(&panel.latest().unwrap());
        assert_eq!(decision.regime, Regime::Defense);
        assert_eq!(decision.defense_asset.as_deref(), Some("B"));
    }

    #[test]
    fn inverse_volatility_slot_weights() {
        let constructor = PortfolioConstructor::new(AllocationParams::default(), &small_universe());
        let expected = [
            (1.0 / 3.0) * (0.25 / 0.3),
            ((1.0 / 3.0) * (0.25 / 0.2_f64)).min(0.40),
            (1.0 / 3.0) * (0.25 / 0.25),
        ];
        for (vol, want) in [0.3, 0.2, 0.25].into_iter().zip(expected) {
            assert_abs_diff_eq!(constructor.slot_weight(vol, false), want, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(expected[1], 0.40, epsilon = 1e-12);

        let ranked: Vec<ScoredCandidate> = [("A", 0.8, 0.3), ("B", 0.5, 0.2), ("C", 0.3, 0.25)]
            .into_iter()
            .map(|(t, score, volatility)| ScoredCandidate {
                ticker: t.into(),
                score,
                volatility,
                price: 100.0,
                recent_high: Some(150.0),
                atr: 2.0,
            })
            .collect();
        let target = constructor.size_candidates(ranked);
        let tickers: Vec<_> = target.lines.iter().map(|l| l.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["A", "B", "C"]);
        assert!(target.total_weight() <= 1.0 + 1e-12);
        assert!(target.lines.iter().all(|l| l.weight <= 0.40));
    }

    #[test]
    fn exit_then_enter() {
        let holdings = Holdings::from([("X".to_string(), 1000.0)]);
        let target = PortfolioTarget {
            lines: vec![
                TargetLine {
                    ticker: "X".into(),
                    weight: 0.0,
                    rationale: RationaleTag::TrendFollow,
                    score: 0.0,
                    volatility: 0.0,
                    atr: 0.0,
                },
                TargetLine {
                    ticker: "Y".into(),
                    weight: 0.5,
                    rationale: RationaleTag::TrendFollow,
                    score: 1.0,
                    volatility: 0.2,
                    atr: 0.0,
                },
            ],
        };
        let prices: BTreeMap<String, f64> = [("X".to_string(), 50.0), ("Y".to_string(), 25.0)].into_iter().collect();
        let plan = plan_rebalance(&holdings, &target, 2000.0, &prices, &RebalanceParams::default(), "BIL");

        let seq: Vec<_> = plan
            .instructions()
            .map(|i| (i.ticker.as_str(), i.side, i.signed_notional))
            .collect();
        assert_eq!(seq.len(), 2);
        assert_eq!((seq[0].0, seq[0].1), ("X", Side::Sell));
        assert!((seq[0].2 + 1000.0).abs() < 1e-9);
        assert_eq!((seq[1].0, seq[1].1), ("Y", Side::Buy));
        assert!(seq[1].2 < 1000.0 && seq[1].2 > 990.0);
    }
}

mod simulation {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig::default()
    }

    #[test]
    fn visits_both_regimes_and_trades() {
        let panel = panel_from(&two_regime_series(500));
        let result = SimulationDriver::new(&small_config(), config()).run(&panel).unwrap();

        assert_eq!(result.points.len(), 500 - 252);
        assert!(result.regime_days(Regime::Attack) > 0);
        assert!(result.regime_days(Regime::Defense) > 0);
        assert!(result.trades.iter().any(|t| t.ticker == "AAA"));
        assert!(result.trades.iter().any(|t| t.ticker == "GLD"));
        assert!(!result.trades.iter().any(|t| t.ticker == "CCC"));

        let metrics = Metrics::compute(&result);
        assert_eq!(metrics.trade_count, result.trades.len());
        assert!(metrics.max_drawdown >= 0.0 && metrics.max_drawdown < 1.0);
    }

    #[test]
    fn no_lookahead_truncated_history_matches_prefix() {
        let panel = panel_from(&two_regime_series(500));
        let driver = SimulationDriver::new(&small_config(), config());
        let full = driver.run(&panel).unwrap();

        for cut in [260, 330, 420] {
            let truncated = panel.clone().truncate_as_of(day(cut));
            let partial = driver.run(&truncated).unwrap();
            let n = partial.points.len();
            assert_eq!(partial.points[..], full.points[..n], "diverged before {}", day(cut));
        }
    }

    #[test]
    fn evaluation_ignores_future_rows() {
        let panel = panel_from(&two_regime_series(500));
        let engine = DecisionEngine::from_config(&small_config());
        for i in [252, 300, 380, 450] {
            let truncated = panel.clone().truncate_as_of(day(i));
            assert_eq!(
                engine.evaluate(&panel.view_through(i).unwrap()),
                engine.evaluate(&truncated.latest().unwrap())
            );
        }
    }

    /// SPY and IEF fall from day 0; GLD only starts trading on day 260.
    fn late_listing_bars(n: usize) -> BTreeMap<String, Vec<OhlcvBar>> {
        let gld = (260..n)
            .map(|i| OhlcvBar::from_close("GLD", day(i), 760.0 + i as f64))
            .collect();
        BTreeMap::from([
            ("SPY".to_string(), bars_from_closes("SPY", &trending(n, -0.002, 0.003))),
            ("IEF".to_string(), bars_from_closes("IEF", &trending(n, -0.001, 0.002))),
            ("AAA".to_string(), bars_from_closes("AAA", &trending(n, 0.003, 0.012))),
            ("GLD".to_string(), gld),
        ])
    }

    fn bars_through(bars: &BTreeMap<String, Vec<OhlcvBar>>, i: usize) -> BTreeMap<String, Vec<OhlcvBar>> {
        bars.iter()
            .map(|(t, b)| (t.clone(), b.iter().filter(|bar| bar.date <= day(i)).cloned().collect::<Vec<_>>()))
            .filter(|(_, b)| !b.is_empty())
            .collect()
    }

    #[test]
    fn late_listing_is_invisible_before_its_first_bar() {
        let bars = late_listing_bars(400);
        let full = PricePanel::from_bars(bars.clone());
        let engine = DecisionEngine::from_config(&small_config());

        for i in [220, 259, 260, 300, 399] {
            let past = PricePanel::from_bars(bars_through(&bars, i));
            assert_eq!(
                engine.evaluate(&full.view_through(i).unwrap()),
                engine.evaluate(&past.latest().unwrap()),
                "diverged on {}",
                day(i)
            );
        }

        let early = engine.evaluate(&full.view_through(220).unwrap());
        assert_eq!(early.decision.regime, Regime::Defense);
        assert_eq!(early.decision.defense_asset.as_deref(), Some("IEF"));
        assert!(full.view_through(220).unwrap().last_close("GLD").is_none());
    }

    #[test]
    fn simulation_never_trades_before_listing() {
        let panel = PricePanel::from_bars(late_listing_bars(400));
        let result = SimulationDriver::new(&small_config(), config()).run(&panel).unwrap();
        assert!(result.trades.iter().filter(|t| t.ticker == "GLD").all(|t| t.date >= day(260)));
        assert!(result.trades.iter().any(|t| t.ticker == "IEF"));
    }

    #[test]
    fn equity_reconstructs_at_every_sampled_step() {
        let panel = panel_from(&two_regime_series(500));
        let driver = SimulationDriver::new(&small_config(), config());
        for cut in (252..500).step_by(17) {
            let truncated = panel.clone().truncate_as_of(day(cut));
            let result = driver.run(&truncated).unwrap();
            let prices = truncated.latest().unwrap().latest_prices();
            let reconstructed = result.ledger.cash
                + result
                    .ledger
                    .positions
                    .iter()
                    .map(|(t, q)| q * prices[t])
                    .sum::<f64>();
            let recorded = result.points.last().unwrap().equity;
            assert_abs_diff_eq!(reconstructed, recorded, epsilon = 1e-6);
        }
    }

    #[test]
    fn dust_never_survives_a_step() {
        let panel = panel_from(&two_regime_series(500));
        let result = SimulationDriver::new(&small_config(), config()).run(&panel).unwrap();
        assert!(result.ledger.positions.values().all(|q| q.abs() >= 0.001));
    }

    #[test]
    fn history_shorter_than_warmup_fails() {
        let panel = panel_from(&[("SPY", trending(100, 0.001, 0.01))]);
        let err = SimulationDriver::new(&small_config(), config()).run(&panel).unwrap_err();
        assert!(matches!(err, TacticianError::InsufficientData { .. }));
    }
}

mod live {
    use super::*;

    const N: usize = 300;

    fn provider() -> MockPriceProvider {
        MockPriceProvider::new()
            .with_closes("SPY", &trending(N, 0.001, 0.005))
            .with_closes("AAA", &trending(N, 0.003, 0.012))
            .with_closes("BBB", &trending(N, 0.002, 0.015))
            .with_closes("CCC", &trending(N, -0.001, 0.01))
            .with_closes("GLD", &trending(N, 0.0005, 0.004))
    }

    fn trader() -> LiveTrader {
        LiveTrader::from_config(&small_config()).with_settle(Duration::ZERO)
    }

    fn today() -> chrono::NaiveDate {
        day(N - 1)
    }

    #[test]
    fn sells_before_buys_after_cancel() {
        let mut broker = MockBroker::new(10_000.0, Holdings::from([("CCC".to_string(), 3000.0)]));
        broker.open_orders = 2;
        let mut gate = MemoryGate::default();

        let outcome = run_live_cycle(today(), &trader(), &provider(), &mut broker, &mut gate).unwrap();
        let LiveCycleOutcome::Executed { evaluation, submitted } = outcome else {
            panic!("expected an executed cycle");
        };
        assert_eq!(evaluation.decision.regime, Regime::Attack);
        assert_eq!(evaluation.date, today());

        assert_eq!(broker.calls[0], BrokerCall::Cancel);
        let subs = broker.submissions();
        assert_eq!(subs[0].0, "CCC");
        assert_eq!(subs[0].2, Side::Sell);
        assert_abs_diff_eq!(subs[0].1, -3000.0, epsilon = 1e-9);
        assert!(subs[1..].iter().all(|s| s.2 == Side::Buy));
        assert!(subs.iter().any(|s| s.0 == "AAA"));
        assert_eq!(submitted.len(), subs.len());
        assert!(gate.done.contains(&today()));
    }

    #[test]
    fn second_run_same_day_is_a_no_op() {
        let mut broker = MockBroker::new(10_000.0, Holdings::new());
        let mut gate = MemoryGate::default();
        run_live_cycle(today(), &trader(), &provider(), &mut broker, &mut gate).unwrap();
        let calls = broker.calls.len();

        let again = run_live_cycle(today(), &trader(), &provider(), &mut broker, &mut gate).unwrap();
        assert_eq!(again, LiveCycleOutcome::AlreadyRan(today()));
        assert_eq!(broker.calls.len(), calls);
    }

    #[test]
    fn buys_are_capped_by_buying_power() {
        let mut broker = MockBroker::new(10_000.0, Holdings::new()).with_buying_power(1000.0);
        let mut gate = MemoryGate::default();
        run_live_cycle(today(), &trader(), &provider(), &mut broker, &mut gate).unwrap();

        let buys: Vec<_> = broker.submissions().into_iter().filter(|s| s.2 == Side::Buy).collect();
        assert!(!buys.is_empty());
        assert!(buys.iter().all(|b| (b.1 - 950.0).abs() < 1e-9));
    }

    #[test]
    fn buys_below_floor_after_cap_are_dropped() {
        let mut broker = MockBroker::new(10_000.0, Holdings::new()).with_buying_power(5.0);
        let mut gate = MemoryGate::default();
        let outcome = run_live_cycle(today(), &trader(), &provider(), &mut broker, &mut gate).unwrap();
        assert!(broker.submissions().is_empty());
        assert!(matches!(outcome, LiveCycleOutcome::Executed { submitted, .. } if submitted.is_empty()));
    }

    #[test]
    fn provider_failure_aborts_without_marking() {
        let mut broker = MockBroker::new(10_000.0, Holdings::new());
        let mut gate = MemoryGate::default();
        let failing = MockPriceProvider::new().with_error("feed down");
        let err = run_live_cycle(today(), &trader(), &failing, &mut broker, &mut gate).unwrap_err();
        assert!(matches!(err, TacticianError::Data { .. }));
        assert!(broker.calls.is_empty());
        assert!(gate.done.is_empty());
    }

    #[test]
    fn broker_rejection_aborts_without_marking() {
        let mut broker = MockBroker::new(10_000.0, Holdings::new()).rejecting("AAA");
        let mut gate = MemoryGate::default();
        let err = run_live_cycle(today(), &trader(), &provider(), &mut broker, &mut gate).unwrap_err();
        assert!(matches!(err, TacticianError::Broker { .. }));
        assert!(gate.done.is_empty());
    }

    #[test]
    fn empty_panel_is_no_data() {
        let mut broker = MockBroker::new(10_000.0, Holdings::new());
        let mut gate = MemoryGate::default();
        let err = run_live_cycle(today(), &trader(), &MockPriceProvider::new(), &mut broker, &mut gate)
            .unwrap_err();
        assert!(matches!(err, TacticianError::NoData { .. }));
    }
}
