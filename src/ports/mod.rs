//! Port traits the domain talks through.

pub mod backtest_port;
pub mod config_port;
pub mod strategy_store_port;
