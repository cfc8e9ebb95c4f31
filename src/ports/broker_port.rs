//! Brokerage port traits used by the live cycle.

use crate::domain::error::TacticianError;
use crate::domain::rebalance::{Holdings, Side};

pub trait HoldingsProvider {
    /// Ticker to current market value.
    fn current(&self) -> Result<Holdings, TacticianError>;
}

pub trait OrderSink {
    /// Submit a dollar-notional order. `notional` is signed: negative sells.
    fn submit(&mut self, ticker: &str, notional: f64, side: Side) -> Result<(), TacticianError>;
}

/// Account state and order management beyond plain submission.
pub trait AccountPort: HoldingsProvider + OrderSink {
    fn equity(&self) -> Result<f64, TacticianError>;
    fn buying_power(&self) -> Result<f64, TacticianError>;
    fn cancel_open_orders(&mut self) -> Result<usize, TacticianError>;
}
