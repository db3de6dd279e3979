//! Core domain types and logic.

pub mod backtest;
pub mod condition;
pub mod condition_grammar;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod persistence;
pub mod session;
pub mod strategy;
pub mod trade;
