//! Weighted multi-window momentum.
//!
//! R(n) = C[-1] / C[-n] - 1
//! MOM  = Σ weight_i * R(window_i)
//! Cold start: fewer closes than the longest window scores exactly 0.0.

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumParams {
    pub windows: [usize; 4],
    pub weights: [f64; 4],
}

impl Default for MomentumParams {
    fn default() -> Self {
        MomentumParams {
            windows: [21, 63, 126, 252],
            weights: [12.0, 4.0, 2.0, 1.0],
        }
    }
}

impl MomentumParams {
    pub fn longest_window(&self) -> usize {
        self.windows.iter().copied().max().unwrap_or(0)
    }
}

/// `C[-1] / C[-window] - 1`: the window counts the current close.
pub fn simple_return(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let now = *closes.last()?;
    let then = closes[closes.len() - window];
    let r = now / then - 1.0;
    r.is_finite().then_some(r)
}

/// Percent change over `lookback` sessions: `C[-1] / C[-1 - lookback] - 1`.
pub fn lookback_return(closes: &[f64], lookback: usize) -> Option<f64> {
    simple_return(closes, lookback + 1)
}

pub fn momentum_score(closes: &[f64], params: &MomentumParams) -> f64 {
    if closes.len() < params.longest_window() {
        return 0.0;
    }

    let mut score = 0.0;
    for (&window, &weight) in params.windows.iter().zip(params.weights.iter()) {
        match simple_return(closes, window) {
            Some(r) => score += weight * r,
            None => return 0.0,
        }
    }

    if score.is_finite() { score } else { 0.0 }
}
