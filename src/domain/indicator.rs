//! Indicator definitions and the static per-type registry.
//!
//! Indicator math lives in the backtest service; this module only knows how an
//! indicator is named, which parameters it takes by default, and how it
//! appears on the wire:
//! - `Indicator`: a type string plus its numeric parameters
//! - `IndicatorParams`: ordered parameter map (deterministic serialization)
//! - `default_params` / `display_name`: registry lookups, case-insensitive

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type IndicatorParams = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    #[serde(rename = "type")]
    pub indicator_type: String,
    #[serde(default)]
    pub params: IndicatorParams,
}

impl Indicator {
    pub fn new(indicator_type: impl Into<String>, params: IndicatorParams) -> Self {
        Self {
            indicator_type: indicator_type.into(),
            params,
        }
    }

    /// Build an indicator using the registry defaults for its type.
    pub fn with_defaults(indicator_type: impl Into<String>) -> Self {
        let indicator_type = indicator_type.into();
        let params = default_params(&indicator_type);
        Self {
            indicator_type,
            params,
        }
    }

    pub fn display_name(&self) -> String {
        display_name(&self.indicator_type)
    }
}

struct RegistryEntry {
    key: &'static str,
    name: &'static str,
    params: &'static [(&'static str, f64)],
}

const REGISTRY: &[RegistryEntry] = &[
    RegistryEntry {
        key: "sma",
        name: "Simple Moving Average",
        params: &[("Period", 20.0)],
    },
    RegistryEntry {
        key: "ema",
        name: "Exponential Moving Average",
        params: &[("Period", 20.0)],
    },
    RegistryEntry {
        key: "rsi",
        name: "Relative Strength Index",
        params: &[("Period", 14.0)],
    },
    RegistryEntry {
        key: "macd",
        name: "MACD",
        params: &[
            ("Fast Period", 12.0),
            ("Slow Period", 26.0),
            ("Signal Period", 9.0),
        ],
    },
    RegistryEntry {
        key: "bb",
        name: "Bollinger Bands",
        params: &[("Period", 20.0), ("StdDev", 2.0)],
    },
    RegistryEntry {
        key: "stoch",
        name: "Stochastic Oscillator",
        params: &[("K Period", 14.0), ("D Period", 3.0)],
    },
    RegistryEntry {
        key: "atr",
        name: "Average True Range",
        params: &[("Period", 14.0)],
    },
    RegistryEntry {
        key: "obv",
        name: "On-Balance Volume",
        params: &[],
    },
    RegistryEntry {
        key: "vwap",
        name: "Volume Weighted Average Price",
        params: &[],
    },
];

fn lookup(indicator_type: &str) -> Option<&'static RegistryEntry> {
    let key = indicator_type.to_lowercase();
    REGISTRY.iter().find(|entry| entry.key == key)
}

/// Default parameters for a type. Unknown types get an empty set.
pub fn default_params(indicator_type: &str) -> IndicatorParams {
    lookup(indicator_type)
        .map(|entry| {
            entry
                .params
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect()
        })
        .unwrap_or_default()
}

/// Human-readable name. Unknown types render as their uppercased type string.
pub fn display_name(indicator_type: &str) -> String {
    lookup(indicator_type)
        .map(|entry| entry.name.to_string())
        .unwrap_or_else(|| indicator_type.to_uppercase())
}

pub fn is_known(indicator_type: &str) -> bool {
    lookup(indicator_type).is_some()
}
