//! Configuration validation.
//!
//! Everything a command needs from the INI file is checked here, before any
//! network or database work starts.

use crate::domain::backtest::{DEFAULT_INTERVAL, DEFAULT_PERIOD, Timeframe};
use crate::domain::error::StratbenchError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_POOL_SIZE: u32 = 4;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub path: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Http(ServiceConfig),
    Sqlite(SqliteConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub ansi: bool,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratbenchError {
    StratbenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_service_config(config: &dyn ConfigPort) -> Result<ServiceConfig, StratbenchError> {
    let base_url = match config.get_string("service", "base_url") {
        Some(s) if !s.trim().is_empty() => s.trim().trim_end_matches('/').to_string(),
        _ => {
            return Err(StratbenchError::ConfigMissing {
                section: "service".to_string(),
                key: "base_url".to_string(),
            });
        }
    };
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(
            "service",
            "base_url",
            "base_url must start with http:// or https://",
        ));
    }
    Ok(ServiceConfig { base_url })
}

fn validate_sqlite_config(config: &dyn ConfigPort) -> Result<SqliteConfig, StratbenchError> {
    let path = match config.get_string("sqlite", "path") {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            return Err(StratbenchError::ConfigMissing {
                section: "sqlite".to_string(),
                key: "path".to_string(),
            });
        }
    };
    let pool_size = config.get_int("sqlite", "pool_size", i64::from(DEFAULT_POOL_SIZE));
    let pool_size = u32::try_from(pool_size)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid("sqlite", "pool_size", "pool_size must be a positive integer"))?;
    Ok(SqliteConfig { path, pool_size })
}

pub fn validate_store_config(config: &dyn ConfigPort) -> Result<StoreConfig, StratbenchError> {
    let backend = config.get_string_or("store", "backend", "http").to_lowercase();
    match backend.as_str() {
        "http" => validate_service_config(config).map(StoreConfig::Http),
        "sqlite" => validate_sqlite_config(config).map(StoreConfig::Sqlite),
        other => Err(invalid(
            "store",
            "backend",
            format!("unknown backend '{}', expected http or sqlite", other),
        )),
    }
}

/// Resolve the backtest timeframe. Command-line overrides win over the file.
pub fn build_timeframe(
    config: &dyn ConfigPort,
    period: Option<&str>,
    interval: Option<&str>,
) -> Result<Timeframe, StratbenchError> {
    let period = period
        .map(str::to_string)
        .unwrap_or_else(|| config.get_string_or("backtest", "period", DEFAULT_PERIOD));
    let interval = interval
        .map(str::to_string)
        .unwrap_or_else(|| config.get_string_or("backtest", "interval", DEFAULT_INTERVAL));
    let timeframe = Timeframe::new(period, interval);
    timeframe.validate()?;
    Ok(timeframe)
}

pub fn logging_config(config: &dyn ConfigPort) -> LoggingConfig {
    LoggingConfig {
        level: config.get_string_or("logging", "level", DEFAULT_LOG_LEVEL),
        ansi: config.get_bool("logging", "ansi", true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::error::ValidationError;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_service_config_passes() {
        let config = make_config("[service]\nbase_url = https://bench.example.com/\n");
        let service = validate_service_config(&config).unwrap();
        assert_eq!(service.base_url, "https://bench.example.com");
    }

    #[test]
    fn missing_base_url_fails() {
        let config = make_config("[service]\n");
        let err = validate_service_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigMissing { key, .. } if key == "base_url"));
    }

    #[test]
    fn base_url_without_scheme_fails() {
        let config = make_config("[service]\nbase_url = bench.example.com\n");
        let err = validate_service_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "base_url"));
    }

    #[test]
    fn store_defaults_to_http() {
        let config = make_config("[service]\nbase_url = http://localhost:5000\n");
        assert_eq!(
            validate_store_config(&config).unwrap(),
            StoreConfig::Http(ServiceConfig {
                base_url: "http://localhost:5000".into()
            })
        );
    }

    #[test]
    fn sqlite_store_uses_default_pool_size() {
        let config = make_config("[store]\nbackend = SQLite\n\n[sqlite]\npath = /tmp/bench.db\n");
        assert_eq!(
            validate_store_config(&config).unwrap(),
            StoreConfig::Sqlite(SqliteConfig {
                path: "/tmp/bench.db".into(),
                pool_size: DEFAULT_POOL_SIZE,
            })
        );
    }

    #[test]
    fn sqlite_store_requires_path() {
        let config = make_config("[store]\nbackend = sqlite\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigMissing { section, .. } if section == "sqlite"));
    }

    #[test]
    fn zero_pool_size_fails() {
        let config = make_config("[store]\nbackend = sqlite\n\n[sqlite]\npath = a.db\npool_size = 0\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "pool_size"));
    }

    #[test]
    fn unknown_backend_fails() {
        let config = make_config("[store]\nbackend = postgres\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(matches!(err, StratbenchError::ConfigInvalid { key, .. } if key == "backend"));
    }

    #[test]
    fn timeframe_defaults() {
        let config = make_config("[backtest]\n");
        assert_eq!(build_timeframe(&config, None, None).unwrap(), Timeframe::default());
    }

    #[test]
    fn timeframe_from_file_and_overrides() {
        let config = make_config("[backtest]\nperiod = 6mo\ninterval = 1h\n");
        assert_eq!(
            build_timeframe(&config, None, None).unwrap(),
            Timeframe::new("6mo", "1h")
        );
        assert_eq!(
            build_timeframe(&config, Some("2y"), None).unwrap(),
            Timeframe::new("2y", "1h")
        );
    }

    #[test]
    fn blank_override_is_rejected() {
        let config = make_config("[backtest]\n");
        let err = build_timeframe(&config, Some(""), None).unwrap_err();
        assert!(matches!(
            err,
            StratbenchError::Validation(ValidationError::InvalidTimeframe { .. })
        ));
    }

    #[test]
    fn logging_defaults() {
        let config = make_config("[service]\n");
        assert_eq!(
            logging_config(&config),
            LoggingConfig {
                level: "info".into(),
                ansi: true
            }
        );
        let config = make_config("[logging]\nlevel = debug\nansi = no\n");
        assert_eq!(
            logging_config(&config),
            LoggingConfig {
                level: "debug".into(),
                ansi: false
            }
        );
    }
}
