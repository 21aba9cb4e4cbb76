//! Core domain types and logic.

pub mod price;
pub mod calendar;
pub mod momentum;
pub mod signal;
pub mod returns;
pub mod backtest;
pub mod metrics;
pub mod position;
pub mod order;
pub mod reconcile;
pub mod config_validation;
pub mod error;
