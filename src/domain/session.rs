//! One user's working state: the strategy being edited and the last results.

use crate::domain::backtest::{self, BacktestOutcome, BacktestRequest, Timeframe};
use crate::domain::error::StratbenchError;
use crate::domain::persistence::{LoadedStrategy, SaveRequest};
use crate::domain::strategy::StrategyModel;
use crate::ports::backtest_port::BacktestPort;
use crate::ports::strategy_store_port::StrategyStorePort;
use tracing::{info, warn};

/// Results paired with the exact request that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct LastRun {
    pub request: BacktestRequest,
    pub outcome: BacktestOutcome,
}

#[derive(Debug, Default)]
pub struct StrategySession {
    model: StrategyModel,
    last_run: Option<LastRun>,
}

impl StrategySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: StrategyModel) -> Self {
        Self {
            model,
            last_run: None,
        }
    }

    pub fn model(&self) -> &StrategyModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut StrategyModel {
        &mut self.model
    }

    pub fn last_run(&self) -> Option<&LastRun> {
        self.last_run.as_ref()
    }

    /// Validate the model and timeframe and build the service request.
    /// Dangling indicator references are logged but do not block submission.
    pub fn build_request(&self, timeframe: Timeframe) -> Result<BacktestRequest, StratbenchError> {
        self.model.validate()?;
        timeframe.validate()?;
        for condition in self.model.dangling_references() {
            warn!(
                indicator = condition.indicator_type().unwrap_or_default(),
                "condition references an indicator that is not in the set"
            );
        }
        Ok(BacktestRequest {
            strategy: self.model.serialize(),
            timeframe,
        })
    }

    /// Submit the current strategy. Nothing reaches the port if validation fails,
    /// and the previous results are kept when the call or interpretation fails.
    pub async fn run_backtest(
        &mut self,
        port: &dyn BacktestPort,
        timeframe: Timeframe,
    ) -> Result<&BacktestOutcome, StratbenchError> {
        let request = self.build_request(timeframe)?;
        info!(
            indicators = request.strategy.indicators.len(),
            period = %request.timeframe.period,
            interval = %request.timeframe.interval,
            "submitting backtest"
        );
        let response = port.run_backtest(&request).await?;
        let outcome = backtest::interpret_response(&response)?;
        info!(
            trades = outcome.trades.len(),
            filtered = outcome.warnings.len(),
            "backtest complete"
        );
        let run = self.last_run.insert(LastRun { request, outcome });
        Ok(&run.outcome)
    }

    pub fn save_request(&self, name: &str, description: &str) -> Result<SaveRequest, StratbenchError> {
        let run = self
            .last_run
            .as_ref()
            .ok_or(StratbenchError::NoBacktestResults)?;
        Ok(SaveRequest::new(name, description, &run.request, &run.outcome)?)
    }

    /// Save the last run under `name` and return the store's id.
    pub async fn save(
        &self,
        store: &dyn StrategyStorePort,
        name: &str,
        description: &str,
    ) -> Result<String, StratbenchError> {
        let request = self.save_request(name, description)?;
        let id = store.save(&request).await?;
        info!(%id, name = %request.name, "strategy saved");
        Ok(id)
    }

    /// Replace the model and last results with a stored strategy.
    pub async fn load(&mut self, store: &dyn StrategyStorePort, id: &str) -> Result<&LastRun, StratbenchError> {
        let document = store.load(id).await?;
        let loaded = LoadedStrategy::from_document(&document)?;
        info!(%id, indicators = loaded.model.indicators().len(), "strategy loaded");
        let request = BacktestRequest {
            strategy: loaded.model.serialize(),
            timeframe: loaded.timeframe,
        };
        self.model = loaded.model;
        Ok(self.last_run.insert(LastRun {
            request,
            outcome: loaded.outcome,
        }))
    }

    pub fn reset(&mut self) {
        self.model.clear();
        self.last_run = None;
    }
}
