//! Daily OHLC bar as delivered by a price provider.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcvBar {
    /// Bar with only a close known; open/high/low collapse onto it.
    pub fn from_close(ticker: &str, date: NaiveDate, close: f64) -> Self {
        OhlcvBar {
            ticker: ticker.to_string(),
            date,
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    /// A close is usable only if finite and strictly positive.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
