//! Saved-strategy payloads.
//!
//! A save bundles the configuration that produced a backtest with the results
//! it returned. Loading goes the other way and is lenient about condition
//! cards, so strategies written by other front ends still rehydrate.

use crate::domain::backtest::{self, BacktestOutcome, BacktestRequest, Timeframe, TradeRecords};
use crate::domain::condition_grammar;
use crate::domain::error::{MalformedResponseError, StratbenchError, ValidationError};
use crate::domain::indicator::Indicator;
use crate::domain::metrics::{self, MetricsBundle};
use crate::domain::strategy::{StrategyModel, StrategyPayload};
use crate::domain::trade::RoundTripTrade;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedConfig {
    #[serde(flatten)]
    pub strategy: StrategyPayload,
    pub timeframe: Timeframe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_hold_metrics: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub config: SavedConfig,
    pub trades: Vec<RoundTripTrade>,
    pub metrics: MetricsBundle,
}

impl SaveRequest {
    pub fn new(
        name: &str,
        description: &str,
        request: &BacktestRequest,
        outcome: &BacktestOutcome,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingStrategyName);
        }
        Ok(Self {
            name: name.to_string(),
            description: description.trim().to_string(),
            config: SavedConfig {
                strategy: request.strategy.clone(),
                timeframe: request.timeframe.clone(),
                buy_hold_metrics: outcome.baseline_raw.clone(),
            },
            trades: outcome.trades.clone(),
            metrics: outcome.metrics.clone(),
        })
    }

    /// The `{config, metrics, trades}` document a store hands back on load.
    pub fn stored_document(&self) -> Result<Value, serde_json::Error> {
        Ok(serde_json::json!({
            "config": serde_json::to_value(&self.config)?,
            "metrics": serde_json::to_value(&self.metrics)?,
            "trades": serde_json::to_value(&self.trades)?,
        }))
    }
}

/// A stored strategy rehydrated into domain types.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedStrategy {
    pub model: StrategyModel,
    pub timeframe: Timeframe,
    pub outcome: BacktestOutcome,
}

fn array_field<'a>(object: &'a Value, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Build a model from a strategy object. Indicators are read strictly,
/// condition cards leniently.
pub fn model_from_config(config: &Value) -> Result<StrategyModel, StratbenchError> {
    let indicators: Vec<Indicator> = match config.get("indicators") {
        Some(raw) if !raw.is_null() => serde_json::from_value(raw.clone())?,
        _ => Vec::new(),
    };
    Ok(StrategyModel::from_payload(StrategyPayload {
        indicators,
        entry_conditions: condition_grammar::parse_all(array_field(config, "entry_conditions")),
        exit_conditions: condition_grammar::parse_all(array_field(config, "exit_conditions")),
    })?)
}

impl LoadedStrategy {
    pub fn from_document(document: &Value) -> Result<Self, StratbenchError> {
        let config = document
            .get("config")
            .filter(|c| c.is_object())
            .ok_or_else(|| MalformedResponseError::MissingMetrics {
                section: "config".to_string(),
            })?;

        let model = model_from_config(config)?;

        let timeframe = match config.get("timeframe") {
            Some(raw) if !raw.is_null() => serde_json::from_value(raw.clone())?,
            _ => {
                debug!("stored strategy has no timeframe, using default");
                Timeframe::default()
            }
        };

        let raw_metrics = document
            .get("metrics")
            .filter(|m| !m.is_null())
            .ok_or_else(|| MalformedResponseError::MissingMetrics {
                section: "metrics".to_string(),
            })?;
        let metrics = metrics::normalize(raw_metrics)?;

        let baseline_raw = config
            .get("buy_hold_metrics")
            .filter(|b| !b.is_null())
            .cloned();
        let baseline = baseline_raw
            .as_ref()
            .map(metrics::normalize_baseline)
            .transpose()?;

        let TradeRecords { trades, rejected } = backtest::read_trades(document.get("trades"));

        Ok(Self {
            model,
            timeframe,
            outcome: BacktestOutcome {
                metrics,
                baseline,
                baseline_raw,
                trades,
                warnings: rejected,
            },
        })
    }
}
