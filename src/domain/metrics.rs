//! Metrics reconciliation and strategy-vs-baseline comparison.
//!
//! The backtest service reports metrics in more than one shape: flat, with the
//! risk figures nested under `risk_metrics`, in snake_case or camelCase. All of
//! them are normalized into one `MetricsBundle` before anything is compared.

use crate::domain::error::MalformedResponseError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const NESTED_KEYS: [&str; 2] = ["risk_metrics", "riskMetrics"];

const FULL_MARKET_EXPOSURE: f64 = 100.0;

/// Canonical metrics. Serializes to the flat shape the persistence service stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    pub total_return: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub total_trades: u64,
    pub time_in_market: f64,
    pub sharpe_ratio: f64,
    pub risk_adjusted_return: f64,
}

#[derive(Clone, Copy)]
enum Field {
    TotalReturn,
    WinRate,
    MaxDrawdown,
    TotalTrades,
    TimeInMarket,
    SharpeRatio,
    RiskAdjustedReturn,
}

impl Field {
    fn aliases(self) -> [&'static str; 2] {
        match self {
            Field::TotalReturn => ["total_return", "totalReturn"],
            Field::WinRate => ["win_rate", "winRate"],
            Field::MaxDrawdown => ["max_drawdown", "maxDrawdown"],
            Field::TotalTrades => ["total_trades", "totalTrades"],
            Field::TimeInMarket => ["time_in_market", "timeInMarket"],
            Field::SharpeRatio => ["sharpe_ratio", "sharpeRatio"],
            Field::RiskAdjustedReturn => ["risk_adjusted_return", "riskAdjustedReturn"],
        }
    }

    fn name(self) -> &'static str {
        self.aliases()[0]
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
    let top_level = field
        .aliases()
        .into_iter()
        .find_map(|alias| object.get(alias));
    top_level.or_else(|| {
        NESTED_KEYS
            .iter()
            .filter_map(|key| object.get(*key).and_then(Value::as_object))
            .find_map(|nested| {
                field
                    .aliases()
                    .into_iter()
                    .find_map(|alias| nested.get(alias))
            })
    })
}

fn malformed(field: Field, reason: impl Into<String>) -> MalformedResponseError {
    MalformedResponseError::MalformedMetrics {
        field: field.name().to_string(),
        reason: reason.into(),
    }
}

fn read_number(
    object: &Map<String, Value>,
    field: Field,
    default: Option<f64>,
) -> Result<f64, MalformedResponseError> {
    match lookup(object, field) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| malformed(field, "number out of range")),
        Some(other) => Err(malformed(field, format!("expected a number, found {}", other))),
        None => default.ok_or_else(|| malformed(field, "missing")),
    }
}

fn read_count(
    object: &Map<String, Value>,
    field: Field,
    default: Option<u64>,
) -> Result<u64, MalformedResponseError> {
    match lookup(object, field) {
        Some(Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(count), _) => Ok(count),
            (None, Some(v)) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => {
                Ok(v as u64)
            }
            _ => Err(malformed(field, format!("expected a non-negative integer, found {}", n))),
        },
        Some(other) => Err(malformed(field, format!("expected a number, found {}", other))),
        None => default.ok_or_else(|| malformed(field, "missing")),
    }
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>, MalformedResponseError> {
    raw.as_object()
        .ok_or_else(|| MalformedResponseError::MalformedMetrics {
            field: "metrics".to_string(),
            reason: format!("expected an object, found {}", raw),
        })
}

/// Normalize a strategy metrics payload. Every field is required.
pub fn normalize(raw: &Value) -> Result<MetricsBundle, MalformedResponseError> {
    let object = as_object(raw)?;
    Ok(MetricsBundle {
        total_return: read_number(object, Field::TotalReturn, None)?,
        win_rate: read_number(object, Field::WinRate, None)?,
        max_drawdown: read_number(object, Field::MaxDrawdown, None)?,
        total_trades: read_count(object, Field::TotalTrades, None)?,
        time_in_market: read_number(object, Field::TimeInMarket, None)?,
        sharpe_ratio: read_number(object, Field::SharpeRatio, None)?,
        risk_adjusted_return: read_number(object, Field::RiskAdjustedReturn, None)?,
    })
}

/// Normalize a buy-and-hold payload. The baseline has no trade statistics and is
/// always fully invested, so those fields fall back when absent.
pub fn normalize_baseline(raw: &Value) -> Result<MetricsBundle, MalformedResponseError> {
    let object = as_object(raw)?;
    Ok(MetricsBundle {
        total_return: read_number(object, Field::TotalReturn, None)?,
        win_rate: read_number(object, Field::WinRate, Some(0.0))?,
        max_drawdown: read_number(object, Field::MaxDrawdown, None)?,
        total_trades: read_count(object, Field::TotalTrades, Some(0))?,
        time_in_market: read_number(object, Field::TimeInMarket, Some(FULL_MARKET_EXPOSURE))?,
        sharpe_ratio: read_number(object, Field::SharpeRatio, None)?,
        risk_adjusted_return: read_number(object, Field::RiskAdjustedReturn, None)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnVerdict {
    Outperform,
    Underperform,
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharpeVerdict {
    Better,
    Worse,
    Similar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInMarketNarrative {
    ReducedExposure,
    FullyInvested,
}

impl fmt::Display for TimeInMarketNarrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInMarketNarrative::ReducedExposure => f.write_str(
                "This reduced market exposure could provide additional flexibility for other opportunities.",
            ),
            TimeInMarketNarrative::FullyInvested => {
                f.write_str("This suggests a fully invested approach similar to buy & hold.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub return_delta: f64,
    pub sharpe_delta: f64,
    pub verdict: ReturnVerdict,
    pub sharpe_verdict: SharpeVerdict,
    pub strategy_sharpe: f64,
    pub baseline_sharpe: f64,
    pub time_in_market: f64,
    pub time_in_market_narrative: TimeInMarketNarrative,
}

impl ComparisonResult {
    pub fn return_summary(&self) -> String {
        match self.verdict {
            ReturnVerdict::Outperform => format!(
                "Your strategy outperformed buy & hold by +{:.2}%",
                self.return_delta
            ),
            ReturnVerdict::Underperform => format!(
                "Your strategy underperformed buy & hold by {:.2}%",
                self.return_delta
            ),
            ReturnVerdict::Match => "Your strategy matched buy & hold returns".to_string(),
        }
    }

    pub fn risk_summary(&self) -> String {
        match self.sharpe_verdict {
            SharpeVerdict::Better => format!(
                "On a risk-adjusted basis, your strategy shows better risk-reward characteristics with a higher Sharpe ratio ({:.2} vs {:.2})",
                self.strategy_sharpe, self.baseline_sharpe
            ),
            SharpeVerdict::Worse => format!(
                "On a risk-adjusted basis, your strategy shows worse risk-reward characteristics with a lower Sharpe ratio ({:.2} vs {:.2})",
                self.strategy_sharpe, self.baseline_sharpe
            ),
            SharpeVerdict::Similar => {
                "Your strategy shows similar risk-reward characteristics to buy & hold".to_string()
            }
        }
    }

    pub fn time_summary(&self) -> String {
        format!(
            "Your strategy spent {:.1}% of the time in the market, compared to 100% for buy & hold. {}",
            self.time_in_market, self.time_in_market_narrative
        )
    }

    pub fn narrative(&self) -> [String; 3] {
        [self.return_summary(), self.risk_summary(), self.time_summary()]
    }
}

pub fn compute_comparison(strategy: &MetricsBundle, baseline: &MetricsBundle) -> ComparisonResult {
    let return_delta = strategy.total_return - baseline.total_return;
    let verdict = if return_delta > 0.0 {
        ReturnVerdict::Outperform
    } else if return_delta < 0.0 {
        ReturnVerdict::Underperform
    } else {
        ReturnVerdict::Match
    };

    let sharpe_delta = strategy.sharpe_ratio - baseline.sharpe_ratio;
    let sharpe_verdict = if sharpe_delta > 0.0 {
        SharpeVerdict::Better
    } else if sharpe_delta < 0.0 {
        SharpeVerdict::Worse
    } else {
        SharpeVerdict::Similar
    };

    // Anything at or above full exposure reads as fully invested.
    let time_in_market_narrative = if strategy.time_in_market < FULL_MARKET_EXPOSURE {
        TimeInMarketNarrative::ReducedExposure
    } else {
        TimeInMarketNarrative::FullyInvested
    };

    ComparisonResult {
        return_delta,
        sharpe_delta,
        verdict,
        sharpe_verdict,
        strategy_sharpe: strategy.sharpe_ratio,
        baseline_sharpe: baseline.sharpe_ratio,
        time_in_market: strategy.time_in_market,
        time_in_market_narrative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn bundle(total_return: f64, sharpe_ratio: f64, time_in_market: f64) -> MetricsBundle {
        MetricsBundle {
            total_return,
            win_rate: 50.0,
            max_drawdown: -10.0,
            total_trades: 4,
            time_in_market,
            sharpe_ratio,
            risk_adjusted_return: 0.5,
        }
    }

    #[test]
    fn normalize_nested_service_shape() {
        let raw = json!({
            "total_return": 12.5,
            "win_rate": 60.0,
            "max_drawdown": -8.2,
            "total_trades": 10,
            "risk_metrics": {
                "sharpe_ratio": 1.4,
                "time_in_market": 45.5,
                "risk_adjusted_return": 0.9
            }
        });
        let m = normalize(&raw).unwrap();
        assert_relative_eq!(m.total_return, 12.5);
        assert_eq!(m.total_trades, 10);
        assert_relative_eq!(m.sharpe_ratio, 1.4);
        assert_relative_eq!(m.time_in_market, 45.5);
    }

    #[test]
    fn normalize_flat_persisted_shape() {
        let raw = json!({
            "total_return": 3.0,
            "sharpe_ratio": 0.7,
            "win_rate": 40.0,
            "risk_adjusted_return": 0.2,
            "max_drawdown": -5.0,
            "total_trades": 5,
            "time_in_market": 30.0
        });
        let m = normalize(&raw).unwrap();
        assert_relative_eq!(m.risk_adjusted_return, 0.2);
        assert_eq!(m.total_trades, 5);
    }

    #[test]
    fn normalize_camel_case_shape() {
        let raw = json!({
            "totalReturn": 0.1,
            "winRate": 0.5,
            "maxDrawdown": -0.2,
            "totalTrades": 6.0,
            "riskMetrics": {"sharpeRatio": 1.0, "timeInMarket": 20.0, "riskAdjustedReturn": 0.3}
        });
        let m = normalize(&raw).unwrap();
        assert_eq!(m.total_trades, 6);
        assert_relative_eq!(m.sharpe_ratio, 1.0);
    }

    #[test]
    fn top_level_wins_over_nested() {
        let raw = json!({
            "total_return": 1.0, "win_rate": 1.0, "max_drawdown": 1.0, "total_trades": 1,
            "sharpe_ratio": 2.0, "time_in_market": 50.0, "risk_adjusted_return": 1.0,
            "risk_metrics": {"sharpe_ratio": 9.0}
        });
        assert_relative_eq!(normalize(&raw).unwrap().sharpe_ratio, 2.0);
    }

    #[test]
    fn missing_field_is_malformed() {
        let raw = json!({"total_return": 1.0, "win_rate": 1.0});
        let err = normalize(&raw).unwrap_err();
        assert!(
            matches!(err, MalformedResponseError::MalformedMetrics { field, reason } if field == "max_drawdown" && reason == "missing")
        );
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let raw = json!({
            "total_return": "12%", "win_rate": 1.0, "max_drawdown": 1.0, "total_trades": 1,
            "sharpe_ratio": 2.0, "time_in_market": 50.0, "risk_adjusted_return": 1.0
        });
        let err = normalize(&raw).unwrap_err();
        assert!(
            matches!(err, MalformedResponseError::MalformedMetrics { field, .. } if field == "total_return")
        );
    }

    #[test]
    fn fractional_trade_count_is_malformed() {
        let raw = json!({
            "total_return": 1.0, "win_rate": 1.0, "max_drawdown": 1.0, "total_trades": 2.5,
            "sharpe_ratio": 2.0, "time_in_market": 50.0, "risk_adjusted_return": 1.0
        });
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(normalize(&json!([1, 2, 3])).is_err());
        assert!(normalize(&Value::Null).is_err());
    }

    #[test]
    fn baseline_defaults_trade_stats() {
        let raw = json!({
            "total_return": 55.3,
            "max_drawdown": -20.1,
            "risk_metrics": {"sharpe_ratio": 1.1, "time_in_market": 100, "risk_adjusted_return": 0.8}
        });
        let m = normalize_baseline(&raw).unwrap();
        assert_eq!(m.total_trades, 0);
        assert_relative_eq!(m.win_rate, 0.0);
        assert_relative_eq!(m.time_in_market, 100.0);
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn baseline_defaults_time_in_market_to_full() {
        let raw = json!({
            "total_return": 1.0, "max_drawdown": 0.0,
            "risk_metrics": {"sharpe_ratio": 0.0, "risk_adjusted_return": 0.0}
        });
        assert_relative_eq!(normalize_baseline(&raw).unwrap().time_in_market, 100.0);
    }

    #[test]
    fn baseline_still_requires_return() {
        let raw = json!({"max_drawdown": 0.0, "risk_metrics": {"sharpe_ratio": 0.0, "risk_adjusted_return": 0.0}});
        assert!(normalize_baseline(&raw).is_err());
    }

    #[test]
    fn bundle_serializes_flat() {
        let json = serde_json::to_value(bundle(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json["total_return"], 1.0);
        assert_eq!(json["sharpe_ratio"], 2.0);
        assert_eq!(json["time_in_market"], 3.0);
        assert!(json.get("risk_metrics").is_none());
    }

    #[test]
    fn comparison_outperform() {
        let c = compute_comparison(&bundle(20.0, 1.5, 40.0), &bundle(10.0, 1.0, 100.0));
        assert_eq!(c.verdict, ReturnVerdict::Outperform);
        assert_relative_eq!(c.return_delta, 10.0);
        assert_eq!(c.sharpe_verdict, SharpeVerdict::Better);
        assert_relative_eq!(c.sharpe_delta, 0.5);
    }

    #[test]
    fn comparison_underperform() {
        let c = compute_comparison(&bundle(5.0, 0.5, 40.0), &bundle(10.0, 1.0, 100.0));
        assert_eq!(c.verdict, ReturnVerdict::Underperform);
        assert_eq!(c.sharpe_verdict, SharpeVerdict::Worse);
    }

    #[test]
    fn equal_returns_match_exactly() {
        let c = compute_comparison(&bundle(10.0, 2.0, 40.0), &bundle(10.0, 1.0, 100.0));
        assert_eq!(c.verdict, ReturnVerdict::Match);
        assert_eq!(c.return_delta, 0.0);
        assert_eq!(c.sharpe_verdict, SharpeVerdict::Better);
    }

    #[test]
    fn equal_sharpe_is_similar() {
        let c = compute_comparison(&bundle(1.0, 1.0, 40.0), &bundle(2.0, 1.0, 100.0));
        assert_eq!(c.sharpe_verdict, SharpeVerdict::Similar);
    }

    #[test]
    fn time_in_market_narratives() {
        let base = bundle(0.0, 0.0, 100.0);
        assert_eq!(
            compute_comparison(&bundle(0.0, 0.0, 99.9), &base).time_in_market_narrative,
            TimeInMarketNarrative::ReducedExposure
        );
        assert_eq!(
            compute_comparison(&bundle(0.0, 0.0, 100.0), &base).time_in_market_narrative,
            TimeInMarketNarrative::FullyInvested
        );
        assert_eq!(
            compute_comparison(&bundle(0.0, 0.0, 120.0), &base).time_in_market_narrative,
            TimeInMarketNarrative::FullyInvested
        );
    }

    #[test]
    fn narrative_sentences() {
        let c = compute_comparison(&bundle(15.0, 1.25, 42.0), &bundle(10.0, 1.0, 100.0));
        let [ret, risk, time] = c.narrative();
        assert_eq!(ret, "Your strategy outperformed buy & hold by +5.00%");
        assert!(risk.contains("higher Sharpe ratio (1.25 vs 1.00)"));
        assert!(time.starts_with("Your strategy spent 42.0% of the time in the market"));
        assert!(time.ends_with("additional flexibility for other opportunities."));
    }

    #[test]
    fn match_narrative() {
        let c = compute_comparison(&bundle(10.0, 1.0, 100.0), &bundle(10.0, 1.0, 100.0));
        assert_eq!(c.return_summary(), "Your strategy matched buy & hold returns");
        assert_eq!(
            c.risk_summary(),
            "Your strategy shows similar risk-reward characteristics to buy & hold"
        );
        assert!(c.time_summary().contains("fully invested"));
    }
}
