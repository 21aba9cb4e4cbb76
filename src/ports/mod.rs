//! Port traits for the collaborators the core depends on.

pub mod broker_port;
pub mod config_port;
pub mod price_port;
pub mod report_port;
