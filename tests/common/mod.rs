#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use stratbench::domain::backtest::BacktestRequest;
use stratbench::domain::condition::{Condition, Operator};
use stratbench::domain::error::StratbenchError;
use stratbench::domain::persistence::SaveRequest;
use stratbench::domain::strategy::StrategyModel;
use stratbench::ports::backtest_port::BacktestPort;
use stratbench::ports::strategy_store_port::StrategyStorePort;

/// Replies with a canned response and records every request it receives.
pub struct MockBacktestPort {
    pub response: Value,
    pub failure: Option<String>,
    pub requests: Mutex<Vec<BacktestRequest>>,
}

impl MockBacktestPort {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Value::Null,
            failure: Some(reason.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<BacktestRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl BacktestPort for MockBacktestPort {
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<Value, StratbenchError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(reason) = &self.failure {
            return Err(StratbenchError::Network {
                reason: reason.clone(),
            });
        }
        Ok(self.response.clone())
    }
}

/// In-memory store keyed by sequential ids.
pub struct MockStrategyStore {
    pub saved: Mutex<Vec<SaveRequest>>,
    pub documents: Mutex<HashMap<String, Value>>,
}

impl MockStrategyStore {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            documents: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_document(self, id: &str, document: Value) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), document);
        self
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }
}

#[async_trait]
impl StrategyStorePort for MockStrategyStore {
    async fn save(&self, request: &SaveRequest) -> Result<String, StratbenchError> {
        let mut saved = self.saved.lock().unwrap();
        saved.push(request.clone());
        let id = format!("strat-{}", saved.len());
        self.documents
            .lock()
            .unwrap()
            .insert(id.clone(), request.stored_document()?);
        Ok(id)
    }

    async fn load(&self, id: &str) -> Result<Value, StratbenchError> {
        self.documents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StratbenchError::NotFound { id: id.to_string() })
    }
}

pub fn rsi_strategy() -> StrategyModel {
    let mut model = StrategyModel::new();
    model.add_indicator("rsi", None).unwrap();
    model.set_entry_conditions(vec![Condition::IndicatorCompare {
        indicator_type: "rsi".into(),
        operator: Operator::IsBelow,
        threshold: 30.0,
    }]);
    model.set_exit_conditions(vec![Condition::IndicatorCompare {
        indicator_type: "rsi".into(),
        operator: Operator::IsAbove,
        threshold: 70.0,
    }]);
    model
}

pub fn strategy_metrics() -> Value {
    json!({
        "total_return": 18.5,
        "win_rate": 50.0,
        "max_drawdown": -6.2,
        "total_trades": 2,
        "risk_metrics": {
            "sharpe_ratio": 1.4,
            "time_in_market": 42.0,
            "risk_adjusted_return": 0.9
        }
    })
}

pub fn buy_hold_metrics() -> Value {
    json!({
        "total_return": 12.0,
        "max_drawdown": -20.0,
        "risk_metrics": {
            "sharpe_ratio": 0.7,
            "time_in_market": 100,
            "risk_adjusted_return": 0.4
        }
    })
}

/// A successful service reply with two complete trades and a trailing open buy.
pub fn success_response() -> Value {
    json!({
        "status": "success",
        "strategy_metrics": strategy_metrics(),
        "buy_hold_metrics": buy_hold_metrics(),
        "trades": [
            {"type": "buy", "date": "2024-01-02", "price": 100.0},
            {"type": "sell", "date": "2024-01-20", "price": 112.0, "pl_absolute": 12.0, "pl_percentage": 0.12},
            {"type": "buy", "date": "2024-02-01", "price": 110.0},
            {"type": "sell", "date": "2024-02-15", "price": 104.5, "pl_absolute": -5.5, "pl_percentage": -0.05},
            {"type": "buy", "date": "2024-03-01", "price": 101.0}
        ]
    })
}
