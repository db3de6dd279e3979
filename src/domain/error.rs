//! Domain error types.

/// Configuration problems detected before anything is submitted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("indicator '{indicator_type}' is already added")]
    DuplicateIndicator { indicator_type: String },

    #[error("add at least one indicator")]
    EmptyIndicatorSet,

    #[error("add at least one entry or exit condition")]
    EmptyConditionSet,

    #[error("strategy name must not be empty")]
    MissingStrategyName,

    #[error("invalid timeframe: {reason}")]
    InvalidTimeframe { reason: String },
}

/// Structural problems in a payload returned by the backtest or persistence service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedResponseError {
    #[error("response is missing {section}")]
    MissingMetrics { section: String },

    #[error("malformed metrics field '{field}': {reason}")]
    MalformedMetrics { field: String, reason: String },

    #[error("invalid trade record at index {index}: {reason}")]
    InvalidTradeRecord { index: usize, reason: String },

    #[error("backtest service reported failure: {message}")]
    ServiceFailure { message: String },
}

/// Top-level error type for stratbench.
#[derive(Debug, thiserror::Error)]
pub enum StratbenchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponseError),

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("no stored strategy with id {id}")]
    NotFound { id: String },

    #[error("no backtest results available, run a backtest first")]
    NoBacktestResults,

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("event file line {line}: {reason}")]
    EventParse { line: usize, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratbenchError> for std::process::ExitCode {
    fn from(err: &StratbenchError) -> Self {
        let code: u8 = match err {
            StratbenchError::Io(_) | StratbenchError::Json(_) | StratbenchError::EventParse { .. } => 1,
            StratbenchError::ConfigParse { .. }
            | StratbenchError::ConfigMissing { .. }
            | StratbenchError::ConfigInvalid { .. } => 2,
            StratbenchError::Storage { .. } | StratbenchError::NotFound { .. } => 3,
            StratbenchError::Validation(_) | StratbenchError::NoBacktestResults => 4,
            StratbenchError::MalformedResponse(_) => 5,
            StratbenchError::Network { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
