//! Core domain types and logic.

pub mod allocation;
pub mod config;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod live;
pub mod metrics;
pub mod ohlcv;
pub mod price_panel;
pub mod rebalance;
pub mod regime;
pub mod signal;
pub mod simulation;
pub mod universe;
