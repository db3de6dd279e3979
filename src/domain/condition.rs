//! Condition data structures.
//!
//! - `Operator`: how a series is compared against a threshold
//! - `Condition`: the two supported condition variants, serialized with a
//!   `type` tag exactly as the backtest service expects them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    CrossesAbove,
    CrossesBelow,
    IsAbove,
    IsBelow,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::CrossesAbove,
        Operator::CrossesBelow,
        Operator::IsAbove,
        Operator::IsBelow,
    ];

    /// Wire form, e.g. `crosses-above`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::CrossesAbove => "crosses-above",
            Operator::CrossesBelow => "crosses-below",
            Operator::IsAbove => "is-above",
            Operator::IsBelow => "is-below",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}

/// Human form: dashes replaced by spaces (`crosses above`).
impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('-', " "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Condition {
    IndicatorCompare {
        #[serde(rename = "indicator")]
        indicator_type: String,
        #[serde(rename = "condition")]
        operator: Operator,
        #[serde(rename = "value")]
        threshold: f64,
    },
    PriceLevel {
        #[serde(rename = "condition")]
        operator: Operator,
        #[serde(rename = "price")]
        threshold: f64,
    },
}

impl Condition {
    /// The indicator this condition depends on, if any.
    pub fn indicator_type(&self) -> Option<&str> {
        match self {
            Condition::IndicatorCompare { indicator_type, .. } => Some(indicator_type),
            Condition::PriceLevel { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operator_wire_names() {
        assert_eq!(Operator::CrossesAbove.as_str(), "crosses-above");
        assert_eq!(Operator::IsBelow.as_str(), "is-below");
    }

    #[test]
    fn operator_parses_wire_names() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert!("crosses_above".parse::<Operator>().is_err());
    }

    #[test]
    fn operator_display_replaces_dashes() {
        assert_eq!(Operator::CrossesBelow.to_string(), "crosses below");
        assert_eq!(Operator::IsAbove.to_string(), "is above");
    }

    #[test]
    fn indicator_compare_wire_shape() {
        let cond = Condition::IndicatorCompare {
            indicator_type: "rsi".into(),
            operator: Operator::IsBelow,
            threshold: 30.0,
        };
        let value = serde_json::to_value(&cond).unwrap();
        assert_eq!(
            value,
            json!({"type": "indicator-compare", "indicator": "rsi", "condition": "is-below", "value": 30.0})
        );
    }

    #[test]
    fn price_level_wire_shape() {
        let cond = Condition::PriceLevel {
            operator: Operator::CrossesAbove,
            threshold: 50000.0,
        };
        let value = serde_json::to_value(&cond).unwrap();
        assert_eq!(
            value,
            json!({"type": "price-level", "condition": "crosses-above", "price": 50000.0})
        );
    }

    #[test]
    fn strict_deserialize_rejects_unknown_variant() {
        let result: Result<Condition, _> =
            serde_json::from_value(json!({"type": "volume-spike", "condition": "is-above"}));
        assert!(result.is_err());
    }

    #[test]
    fn indicator_type_only_for_compare() {
        let cond = Condition::IndicatorCompare {
            indicator_type: "sma".into(),
            operator: Operator::CrossesAbove,
            threshold: 0.0,
        };
        assert_eq!(cond.indicator_type(), Some("sma"));
        let price = Condition::PriceLevel {
            operator: Operator::IsAbove,
            threshold: 10.5,
        };
        assert_eq!(price.indicator_type(), None);
    }
}
