//! Trend helpers: SMA, rolling high and distance from trend.

/// Mean of the last `window` closes, current close included.
pub fn simple_moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let sma = closes[closes.len() - window..].iter().sum::<f64>() / window as f64;
    sma.is_finite().then_some(sma)
}

/// Highest of the last `window` closes, current close included.
pub fn rolling_max(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    closes[closes.len() - window..]
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .filter(|m| m.is_finite())
}

/// `price / sma - 1`; 0.0 when the average is not positive.
pub fn trend_distance(price: f64, sma: f64) -> f64 {
    if sma > 0.0 { price / sma - 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_includes_current_close() {
        let closes = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(simple_moving_average(&closes, 2), Some(3.5));
        assert_eq!(simple_moving_average(&closes, 4), Some(2.5));
        assert_eq!(simple_moving_average(&closes, 5), None);
    }

    #[test]
    fn rolling_max_trailing_window() {
        let closes = [10.0, 50.0, 20.0, 30.0];
        assert_eq!(rolling_max(&closes, 2), Some(30.0));
        assert_eq!(rolling_max(&closes, 3), Some(50.0));
        assert_eq!(rolling_max(&closes, 0), None);
    }

    #[test]
    fn trend_distance_sign() {
        assert!((trend_distance(100.0, 95.0) - (100.0 / 95.0 - 1.0)).abs() < 1e-12);
        assert!(trend_distance(90.0, 95.0) < 0.0);
        assert_eq!(trend_distance(90.0, 0.0), 0.0);
    }
}
