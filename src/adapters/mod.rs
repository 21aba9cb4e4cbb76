//! Concrete adapter implementations for ports.

#[cfg(feature = "alpaca")]
pub mod alpaca_adapter;
pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
