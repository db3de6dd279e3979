//! Persistence boundary for saved strategies.

use crate::domain::error::StratbenchError;
use crate::domain::persistence::SaveRequest;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait StrategyStorePort: Send + Sync {
    /// Store a strategy with its results and return the assigned id.
    async fn save(&self, request: &SaveRequest) -> Result<String, StratbenchError>;

    /// Fetch a stored strategy as `{config, metrics, trades}`.
    ///
    /// Returns `StratbenchError::NotFound` when no strategy has `id`.
    async fn load(&self, id: &str) -> Result<Value, StratbenchError>;
}
