//! Average True Range.
//!
//! TR[i]  = max(H[i] - L[i], |H[i] - C[i-1]|, |L[i] - C[i-1]|); TR[0] = H[0] - L[0]
//! ATR(n) = simple mean of the last n TR values

/// True range of one bar; without a previous close it is the bar's own range.
pub fn true_range(high: f64, low: f64, prev_close: Option<f64>) -> f64 {
    let hl = high - low;
    match prev_close {
        Some(pc) => hl.max((high - pc).abs()).max((low - pc).abs()),
        None => hl,
    }
}

pub fn average_true_range(high: &[f64], low: &[f64], close: &[f64], window: usize) -> f64 {
    let n = high.len().min(low.len()).min(close.len());
    if window == 0 || n < window {
        return 0.0;
    }

    let sum: f64 = (n - window..n)
        .map(|i| {
            let prev_close = i.checked_sub(1).map(|p| close[p]);
            true_range(high[i], low[i], prev_close)
        })
        .sum();
    let atr = sum / window as f64;

    if atr.is_nan() { 0.0 } else { atr }
}
