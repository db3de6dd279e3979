//! HTTP client for the backtest and strategy persistence service.

use crate::domain::backtest::BacktestRequest;
use crate::domain::config_validation::ServiceConfig;
use crate::domain::error::StratbenchError;
use crate::domain::persistence::SaveRequest;
use crate::ports::backtest_port::BacktestPort;
use crate::ports::strategy_store_port::StrategyStorePort;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error};

pub struct HttpServiceAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl HttpServiceAdapter {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json(response: reqwest::Response, what: &str) -> Result<Value, StratbenchError> {
        let status = response.status();
        if !status.is_success() {
            let reason = failure_reason(what, status, response.text().await);
            error!("{} request failed: {}", what, reason);
            return Err(StratbenchError::Network { reason });
        }
        response.json::<Value>().await.map_err(|e| StratbenchError::Network {
            reason: format!("{} returned unreadable body: {}", what, e),
        })
    }
}

fn failure_reason<E: std::fmt::Display>(what: &str, status: StatusCode, body: Result<String, E>) -> String {
    match body {
        Ok(body) => format!("{} returned {}: {}", what, status, body),
        Err(e) => format!("{} returned {} (body unreadable: {})", what, status, e),
    }
}

fn network_error(e: reqwest::Error) -> StratbenchError {
    StratbenchError::Network {
        reason: e.to_string(),
    }
}

/// Extract the id from a `{status, strategy_id}` save reply.
pub fn parse_save_reply(reply: &Value) -> Result<String, StratbenchError> {
    let status = reply.get("status").and_then(Value::as_str);
    if status != Some("success") {
        let message = reply
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("save rejected");
        return Err(StratbenchError::Storage {
            reason: message.to_string(),
        });
    }
    match reply.get("strategy_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(StratbenchError::Storage {
            reason: "save reply has no strategy_id".to_string(),
        }),
    }
}

#[async_trait]
impl BacktestPort for HttpServiceAdapter {
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<Value, StratbenchError> {
        let url = self.url("/api/backtest");
        debug!(%url, "posting backtest request");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        Self::read_json(response, "backtest").await
    }
}

#[async_trait]
impl StrategyStorePort for HttpServiceAdapter {
    async fn save(&self, request: &SaveRequest) -> Result<String, StratbenchError> {
        let url = self.url("/api/save-strategy");
        debug!(%url, name = %request.name, "posting strategy");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        let reply = Self::read_json(response, "save-strategy").await?;
        parse_save_reply(&reply)
    }

    async fn load(&self, id: &str) -> Result<Value, StratbenchError> {
        let url = self.url(&format!("/api/strategy/{}", id));
        debug!(%url, "fetching strategy");
        let response = self.client.get(&url).send().await.map_err(network_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StratbenchError::NotFound { id: id.to_string() });
        }
        Self::read_json(response, "strategy").await
    }
}
