//! Boundary to the remote backtest service.

use crate::domain::backtest::BacktestRequest;
use crate::domain::error::StratbenchError;
use async_trait::async_trait;
use serde_json::Value;

/// Submits a strategy and returns the service's raw JSON reply.
///
/// Implementations only move bytes; interpreting the reply is
/// [`crate::domain::backtest::interpret_response`]'s job.
#[async_trait]
pub trait BacktestPort: Send + Sync {
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<Value, StratbenchError>;
}
