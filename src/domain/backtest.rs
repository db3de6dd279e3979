//! Backtest request building and response interpretation.
//!
//! The service owns all numerical work. This module shapes what is sent to it
//! and turns what comes back into canonical metrics plus round-trip trades.

use crate::domain::error::{MalformedResponseError, ValidationError};
use crate::domain::metrics::{self, ComparisonResult, MetricsBundle};
use crate::domain::strategy::StrategyPayload;
use crate::domain::trade::{self, RawEvent, RoundTripTrade, Side};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const DEFAULT_PERIOD: &str = "1y";
pub const DEFAULT_INTERVAL: &str = "1d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub period: String,
    pub interval: String,
}

impl Timeframe {
    pub fn new(period: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            interval: interval.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.period.trim().is_empty() {
            return Err(ValidationError::InvalidTimeframe {
                reason: "period must not be empty".to_string(),
            });
        }
        if self.interval.trim().is_empty() {
            return Err(ValidationError::InvalidTimeframe {
                reason: "interval must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_INTERVAL)
    }
}

/// Request body for the backtest service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    #[serde(flatten)]
    pub strategy: StrategyPayload,
    pub timeframe: Timeframe,
}

/// A successfully interpreted backtest response.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub metrics: MetricsBundle,
    pub baseline: Option<MetricsBundle>,
    /// Buy-and-hold metrics as the service sent them, kept for persistence.
    pub baseline_raw: Option<Value>,
    pub trades: Vec<RoundTripTrade>,
    /// Trade records that were filtered out.
    pub warnings: Vec<MalformedResponseError>,
}

impl BacktestOutcome {
    pub fn comparison(&self) -> Option<ComparisonResult> {
        self.baseline
            .as_ref()
            .map(|baseline| metrics::compute_comparison(&self.metrics, baseline))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeRecords {
    pub trades: Vec<RoundTripTrade>,
    pub rejected: Vec<MalformedResponseError>,
}

enum TradeRecord {
    Event(RawEvent),
    RoundTrip(RoundTripTrade),
}

fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| object.get(*k))
}

fn timestamp_field(object: &Map<String, Value>, keys: &[&str]) -> Result<chrono::NaiveDateTime, String> {
    let raw = field(object, keys)
        .ok_or_else(|| format!("missing {}", keys[0]))?
        .as_str()
        .ok_or_else(|| format!("{} is not a string", keys[0]))?;
    trade::parse_timestamp(raw).ok_or_else(|| format!("unparsable {} '{}'", keys[0], raw))
}

fn price_field(object: &Map<String, Value>, keys: &[&str]) -> Result<f64, String> {
    let price = field(object, keys)
        .ok_or_else(|| format!("missing {}", keys[0]))?
        .as_f64()
        .ok_or_else(|| format!("{} is not a number", keys[0]))?;
    if price > 0.0 {
        Ok(price)
    } else {
        Err(format!("{} must be positive", keys[0]))
    }
}

fn classify(record: &Value) -> Result<TradeRecord, String> {
    let object = record
        .as_object()
        .ok_or_else(|| "record is not an object".to_string())?;

    if let Some(side) = field(object, &["type", "side"]) {
        let side = side
            .as_str()
            .ok_or_else(|| "side is not a string".to_string())?
            .parse::<Side>()?;
        return Ok(TradeRecord::Event(RawEvent {
            timestamp: timestamp_field(object, &["date", "timestamp"])?,
            side,
            price: price_field(object, &["price"])?,
        }));
    }

    let entry_timestamp = timestamp_field(object, &["entry_date", "entry_timestamp"])?;
    let exit_timestamp = timestamp_field(object, &["exit_date", "exit_timestamp"])?;
    if exit_timestamp < entry_timestamp {
        return Err("exit is before entry".to_string());
    }
    Ok(TradeRecord::RoundTrip(RoundTripTrade::new(
        entry_timestamp,
        price_field(object, &["entry_price"])?,
        exit_timestamp,
        price_field(object, &["exit_price"])?,
    )))
}

/// Turn a response trade array into round trips. Records may be raw buy/sell
/// events, already-paired round trips, or a mix; invalid ones are filtered out
/// and reported in `rejected`.
pub fn parse_trade_records(records: &[Value]) -> TradeRecords {
    let mut events = Vec::new();
    let mut trades = Vec::new();
    let mut rejected = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match classify(record) {
            Ok(TradeRecord::Event(event)) => events.push(event),
            Ok(TradeRecord::RoundTrip(trade)) => trades.push(trade),
            Err(reason) => {
                warn!(index, %reason, "filtering out invalid trade record");
                rejected.push(MalformedResponseError::InvalidTradeRecord { index, reason });
            }
        }
    }

    if !events.is_empty() {
        trades.extend(trade::reconstruct(&events));
        trades.sort_by(|a, b| a.exit_timestamp.cmp(&b.exit_timestamp));
    }

    TradeRecords { trades, rejected }
}

/// A list nested under the strategy metrics takes precedence over a top-level one.
fn trades_array<'a>(response: &'a Value, metrics: &'a Value) -> Option<&'a Value> {
    metrics.get("trades").or_else(|| response.get("trades"))
}

/// Read the trade list of a response-like object. A missing list yields no
/// trades; a non-array is reported as a rejected record.
pub fn read_trades(trades: Option<&Value>) -> TradeRecords {
    match trades {
        Some(Value::Array(records)) => parse_trade_records(records),
        Some(other) => {
            warn!("trades is not an array: {}", other);
            TradeRecords {
                trades: Vec::new(),
                rejected: vec![MalformedResponseError::InvalidTradeRecord {
                    index: 0,
                    reason: "trades is not an array".to_string(),
                }],
            }
        }
        None => {
            warn!("no trades array in response");
            TradeRecords::default()
        }
    }
}

/// Interpret a raw backtest response.
pub fn interpret_response(response: &Value) -> Result<BacktestOutcome, MalformedResponseError> {
    let status = response.get("status").and_then(Value::as_str);
    if status != Some("success") {
        let message = response
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("status {}", status.unwrap_or("missing")));
        return Err(MalformedResponseError::ServiceFailure { message });
    }

    let raw_metrics = response
        .get("strategy_metrics")
        .filter(|v| !v.is_null())
        .ok_or_else(|| MalformedResponseError::MissingMetrics {
            section: "strategy_metrics".to_string(),
        })?;
    let metrics = metrics::normalize(raw_metrics)?;

    let baseline_raw = response
        .get("buy_hold_metrics")
        .filter(|v| !v.is_null())
        .cloned();
    let baseline = match baseline_raw {
        Some(ref raw) => Some(metrics::normalize_baseline(raw)?),
        None => {
            warn!("no buy_hold_metrics in response, comparison unavailable");
            None
        }
    };

    let TradeRecords { trades, rejected } = read_trades(trades_array(response, raw_metrics));

    Ok(BacktestOutcome {
        metrics,
        baseline,
        baseline_raw,
        trades,
        warnings: rejected,
    })
}
