//! Signal computations: pure functions from a close series to a scalar.
//!
//! - `momentum`: weighted multi-window momentum and simple returns
//! - `volatility`: annualized realized volatility
//! - `atr`: average true range
//! - `trend`: moving average, rolling high and trend distance
//!
//! Every public signal fails closed to a neutral 0.0 instead of erroring;
//! callers treat 0.0 as "exclude this candidate". The `Option`-returning
//! helpers keep "absent" and "zero" apart where that matters.

pub mod atr;
pub mod momentum;
pub mod trend;
pub mod volatility;

pub use atr::average_true_range;
pub use momentum::{MomentumParams, lookback_return, momentum_score, simple_return};
pub use trend::{rolling_max, simple_moving_average, trend_distance};
pub use volatility::{annualized_volatility, realized_volatility};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
