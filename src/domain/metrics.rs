//! Performance statistics over a simulation equity curve.

use super::regime::Regime;
use super::signal::TRADING_DAYS_PER_YEAR;
use super::simulation::{SimulationPoint, SimulationResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    /// Benchmark close-to-close return over the simulated window.
    pub benchmark_return: Option<f64>,
    pub attack_days: usize,
    pub defense_days: usize,
    pub trade_count: usize,
    pub total_cost: f64,
}

impl Metrics {
    pub fn compute(result: &SimulationResult) -> Self {
        let points = &result.points;
        let initial_capital = result.ledger.initial_capital;
        let final_equity = result.final_equity();

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = points.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(points);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(points);

        Metrics {
            final_equity,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            benchmark_return: benchmark_return(points),
            attack_days: result.regime_days(Regime::Attack),
            defense_days: result.regime_days(Regime::Defense),
            trade_count: result.trades.len(),
            total_cost: result.total_cost,
        }
    }
}

fn benchmark_return(points: &[SimulationPoint]) -> Option<f64> {
    let first = points.iter().find_map(|p| p.benchmark_price)?;
    let last = points.iter().rev().find_map(|p| p.benchmark_price)?;
    (first > 0.0).then(|| last / first - 1.0)
}

/// Largest peak-to-trough fraction and the longest run of steps spent below
/// a prior peak.
fn compute_drawdown(points: &[SimulationPoint]) -> (f64, i64) {
    let Some(first) = points.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in points {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(points: &[SimulationPoint]) -> (f64, f64) {
    if points.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = points
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 {
        (mean / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r.powi(2)).sum();
    let downside_stddev = (downside / n).sqrt();
    let sortino = if downside_stddev > 0.0 {
        (mean / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
