//! Strategy configuration and the commands that mutate it.
//!
//! A `StrategyModel` is owned by exactly one session. Every command returns a
//! `ConfigChange` describing what happened so an observer can re-render
//! without the model knowing anything about presentation.

use crate::domain::condition::Condition;
use crate::domain::error::ValidationError;
use crate::domain::indicator::{Indicator, IndicatorParams, default_params};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The serialized strategy, exactly mirroring the model's internal shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyPayload {
    #[serde(default)]
    pub indicators: Vec<Indicator>,
    #[serde(default)]
    pub entry_conditions: Vec<Condition>,
    #[serde(default)]
    pub exit_conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    IndicatorAdded(String),
    IndicatorRemoved(String),
    IndicatorParamsUpdated(String),
    EntryConditionsReplaced(usize),
    ExitConditionsReplaced(usize),
    Cleared,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyModel {
    indicators: Vec<Indicator>,
    entry: Vec<Condition>,
    exit: Vec<Condition>,
}

impl StrategyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a model from a stored or submitted payload. An indicator with
    /// no params gets the registry defaults.
    pub fn from_payload(payload: StrategyPayload) -> Result<Self, ValidationError> {
        let mut model = Self::new();
        for indicator in payload.indicators {
            let params = (!indicator.params.is_empty()).then_some(indicator.params);
            model.add_indicator(indicator.indicator_type, params)?;
        }
        model.set_entry_conditions(payload.entry_conditions);
        model.set_exit_conditions(payload.exit_conditions);
        Ok(model)
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn entry(&self) -> &[Condition] {
        &self.entry
    }

    pub fn exit(&self) -> &[Condition] {
        &self.exit
    }

    pub fn has_indicator(&self, indicator_type: &str) -> bool {
        self.indicators
            .iter()
            .any(|i| i.indicator_type == indicator_type)
    }

    /// Add an indicator. Omitted params come from the registry defaults.
    /// A failed call leaves the model untouched.
    pub fn add_indicator(
        &mut self,
        indicator_type: impl Into<String>,
        params: Option<IndicatorParams>,
    ) -> Result<ConfigChange, ValidationError> {
        let indicator_type = indicator_type.into();
        if self.has_indicator(&indicator_type) {
            return Err(ValidationError::DuplicateIndicator { indicator_type });
        }
        let params = params.unwrap_or_else(|| default_params(&indicator_type));
        debug!(indicator = %indicator_type, "indicator added");
        self.indicators
            .push(Indicator::new(indicator_type.clone(), params));
        Ok(ConfigChange::IndicatorAdded(indicator_type))
    }

    pub fn remove_indicator(&mut self, indicator_type: &str) -> ConfigChange {
        let before = self.indicators.len();
        self.indicators.retain(|i| i.indicator_type != indicator_type);
        if self.indicators.len() == before {
            ConfigChange::Unchanged
        } else {
            ConfigChange::IndicatorRemoved(indicator_type.to_string())
        }
    }

    /// Replace the params of an existing indicator. Absent types are ignored.
    pub fn update_indicator_params(
        &mut self,
        indicator_type: &str,
        params: IndicatorParams,
    ) -> ConfigChange {
        match self
            .indicators
            .iter_mut()
            .find(|i| i.indicator_type == indicator_type)
        {
            Some(indicator) => {
                indicator.params = params;
                ConfigChange::IndicatorParamsUpdated(indicator_type.to_string())
            }
            None => ConfigChange::Unchanged,
        }
    }

    pub fn set_entry_conditions(&mut self, conditions: Vec<Condition>) -> ConfigChange {
        self.entry = conditions;
        ConfigChange::EntryConditionsReplaced(self.entry.len())
    }

    pub fn set_exit_conditions(&mut self, conditions: Vec<Condition>) -> ConfigChange {
        self.exit = conditions;
        ConfigChange::ExitConditionsReplaced(self.exit.len())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.indicators.is_empty() {
            return Err(ValidationError::EmptyIndicatorSet);
        }
        if self.entry.is_empty() && self.exit.is_empty() {
            return Err(ValidationError::EmptyConditionSet);
        }
        Ok(())
    }

    /// Indicator-compare conditions whose indicator is not in the set.
    pub fn dangling_references(&self) -> Vec<&Condition> {
        self.entry
            .iter()
            .chain(self.exit.iter())
            .filter(|c| match c.indicator_type() {
                Some(ind) => !self.has_indicator(ind),
                None => false,
            })
            .collect()
    }

    pub fn serialize(&self) -> StrategyPayload {
        StrategyPayload {
            indicators: self.indicators.clone(),
            entry_conditions: self.entry.clone(),
            exit_conditions: self.exit.clone(),
        }
    }

    pub fn clear(&mut self) -> ConfigChange {
        self.indicators.clear();
        self.entry.clear();
        self.exit.clear();
        ConfigChange::Cleared
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty() && self.entry.is_empty() && self.exit.is_empty()
    }
}
