//! In-memory broker for dry runs: dollar holdings plus cash, immediate fills.

use crate::domain::error::TacticianError;
use crate::domain::rebalance::{Holdings, Side};
use crate::ports::broker_port::{AccountPort, HoldingsProvider, OrderSink};
use log::info;

/// Residual dollar value treated as a closed position.
const CLOSED_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub ticker: String,
    pub side: Side,
    pub notional: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PaperBroker {
    cash: f64,
    holdings: Holdings,
    fills: Vec<Fill>,
}

impl PaperBroker {
    pub fn new(cash: f64, holdings: Holdings) -> Self {
        PaperBroker {
            cash,
            holdings,
            fills: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }
}

impl HoldingsProvider for PaperBroker {
    fn current(&self) -> Result<Holdings, TacticianError> {
        Ok(self.holdings.clone())
    }
}

impl OrderSink for PaperBroker {
    fn submit(&mut self, ticker: &str, notional: f64, side: Side) -> Result<(), TacticianError> {
        let amount = notional.abs();
        match side {
            Side::Buy => {
                if amount > self.cash + CLOSED_EPSILON {
                    return Err(TacticianError::Broker {
                        reason: format!("buy {ticker} {amount:.2} exceeds cash {:.2}", self.cash),
                    });
                }
                self.cash -= amount;
                *self.holdings.entry(ticker.to_string()).or_insert(0.0) += amount;
            }
            Side::Sell => {
                let held = self.holdings.get(ticker).copied().unwrap_or(0.0);
                if amount > held + CLOSED_EPSILON {
                    return Err(TacticianError::Broker {
                        reason: format!("sell {ticker} {amount:.2} exceeds position {held:.2}"),
                    });
                }
                self.cash += amount;
                if held - amount <= CLOSED_EPSILON {
                    self.holdings.remove(ticker);
                } else {
                    self.holdings.insert(ticker.to_string(), held - amount);
                }
            }
        }
        info!("paper fill {side} {ticker} {amount:.2}");
        self.fills.push(Fill {
            ticker: ticker.to_string(),
            side,
            notional: amount,
        });
        Ok(())
    }
}

impl AccountPort for PaperBroker {
    fn equity(&self) -> Result<f64, TacticianError> {
        Ok(self.cash + self.holdings.values().sum::<f64>())
    }

    fn buying_power(&self) -> Result<f64, TacticianError> {
        Ok(self.cash.max(0.0))
    }

    /// Paper orders fill on submission, so nothing is ever open.
    fn cancel_open_orders(&mut self) -> Result<usize, TacticianError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> PaperBroker {
        PaperBroker::new(1000.0, Holdings::from([("X".to_string(), 500.0)]))
    }

    #[test]
    fn equity_is_cash_plus_holdings() {
        assert!((broker().equity().unwrap() - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn buy_moves_cash_into_holding() {
        let mut b = broker();
        b.submit("Y", 400.0, Side::Buy).unwrap();
        assert!((b.cash() - 600.0).abs() < f64::EPSILON);
        assert_eq!(b.current().unwrap().get("Y"), Some(&400.0));
        assert_eq!(b.fills().len(), 1);
    }

    #[test]
    fn full_sell_closes_position() {
        let mut b = broker();
        b.submit("X", -500.0, Side::Sell).unwrap();
        assert!(!b.current().unwrap().contains_key("X"));
        assert!((b.buying_power().unwrap() - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn oversized_orders_are_rejected() {
        let mut b = broker();
        assert!(matches!(b.submit("Y", 2000.0, Side::Buy), Err(TacticianError::Broker { .. })));
        assert!(matches!(b.submit("X", -600.0, Side::Sell), Err(TacticianError::Broker { .. })));
        assert!((b.equity().unwrap() - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_to_cancel() {
        assert_eq!(broker().cancel_open_orders().unwrap(), 0);
    }
}
