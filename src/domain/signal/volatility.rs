//! Annualized realized volatility.
//!
//! r[i]  = C[i] / C[i-1] - 1
//! VOL(n) = sample_stddev(r over the last n returns) * sqrt(252)
//! Needs n + 1 closes. Absent, NaN or zero volatility scores 0.0.

use super::TRADING_DAYS_PER_YEAR;

/// Daily percentage returns; one shorter than the input.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Sample standard deviation (n - 1 denominator).
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    std.is_finite().then_some(std)
}

/// `None` when history is too short or the result is not finite. A flat
/// series yields `Some(0.0)`.
pub fn realized_volatility(closes: &[f64], window: usize) -> Option<f64> {
    if window < 2 || closes.len() < window + 1 {
        return None;
    }
    let tail = &closes[closes.len() - window - 1..];
    let returns = daily_returns(tail);
    sample_stddev(&returns).map(|std| std * TRADING_DAYS_PER_YEAR.sqrt())
}

pub fn annualized_volatility(closes: &[f64], window: usize) -> f64 {
    match realized_volatility(closes, window) {
        Some(vol) if vol > 0.0 => vol,
        _ => 0.0,
    }
}
