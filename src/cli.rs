//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvEventAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestOutcome, Timeframe, interpret_response};
use crate::domain::condition_grammar;
use crate::domain::config_validation::{
    self, LoggingConfig, StoreConfig, build_timeframe, logging_config,
};
use crate::domain::error::StratbenchError;
use crate::domain::indicator;
use crate::domain::metrics::MetricsBundle;
use crate::domain::persistence::model_from_config;
use crate::domain::session::StrategySession;
use crate::domain::strategy::StrategyModel;
use crate::domain::trade::{RoundTripTrade, reconstruct};
use crate::ports::backtest_port::BacktestPort;
use crate::ports::strategy_store_port::StrategyStorePort;

#[derive(Parser, Debug)]
#[command(name = "stratbench", about = "Trading strategy builder and backtest client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a strategy file and print its rules
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Reconstruct round-trip trades from a buy/sell event CSV
    Reconstruct {
        #[arg(short, long)]
        events: PathBuf,
    },
    /// Interpret a saved backtest service response
    Interpret {
        #[arg(short, long)]
        response: PathBuf,
    },
    /// Submit a strategy to the backtest service
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        interval: Option<String>,
        /// Save the results under this name
        #[arg(long)]
        save: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Load a stored strategy and its results
    Load {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Reconstruct { events } => run_reconstruct(&events),
        Command::Interpret { response } => run_interpret(&response),
        Command::Backtest {
            config,
            strategy,
            period,
            interval,
            save,
            description,
        } => run_backtest(
            &config,
            &strategy,
            period.as_deref(),
            interval.as_deref(),
            save.as_deref(),
            &description,
        ),
        Command::Load { config, id } => run_load(&config, &id),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the config file.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: config_validation::DEFAULT_LOG_LEVEL.to_string(),
        ansi: true,
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StratbenchError> {
    eprintln!("Loading config from {}", path.display());
    let config = FileConfigAdapter::from_file(path)?;
    init_logging(&logging_config(&config));
    Ok(config)
}

/// Read a strategy file (`{indicators, entry_conditions, exit_conditions}`).
pub fn read_strategy_file(path: &Path) -> Result<StrategyModel, StratbenchError> {
    let content = fs::read_to_string(path)?;
    let raw: Value = serde_json::from_str(&content)?;
    model_from_config(&raw)
}

pub fn format_strategy(model: &StrategyModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Indicators:");
    for ind in model.indicators() {
        let params = ind
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "  {} ({}) [{}]", ind.display_name(), ind.indicator_type, params);
    }
    let _ = writeln!(out, "\nEntry Rules:\n{}", condition_grammar::render(model.entry()));
    let _ = writeln!(out, "\nExit Rules:\n{}", condition_grammar::render(model.exit()));
    out
}

pub fn format_metrics(title: &str, metrics: &MetricsBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", title);
    let _ = writeln!(out, "Total Return:     {:.2}%", metrics.total_return);
    let _ = writeln!(out, "Win Rate:         {:.1}%", metrics.win_rate);
    let _ = writeln!(out, "Max Drawdown:     {:.2}%", metrics.max_drawdown);
    let _ = writeln!(out, "Total Trades:     {}", metrics.total_trades);
    let _ = writeln!(out, "Time in Market:   {:.1}%", metrics.time_in_market);
    let _ = writeln!(out, "Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    let _ = writeln!(out, "Risk-Adj Return:  {:.2}", metrics.risk_adjusted_return);
    out
}

pub fn format_trades(trades: &[RoundTripTrade]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:>12} {:<20} {:>12} {:>12} {:>9}",
        "Entry", "Entry Price", "Exit", "Exit Price", "P&L", "P&L %"
    );
    for t in trades {
        let _ = writeln!(
            out,
            "{:<20} {:>12.2} {:<20} {:>12.2} {:>12.2} {:>8.2}%",
            t.entry_timestamp.format("%Y-%m-%d %H:%M").to_string(),
            t.entry_price,
            t.exit_timestamp.format("%Y-%m-%d %H:%M").to_string(),
            t.exit_price,
            t.pnl_absolute,
            t.pnl_percent * 100.0
        );
    }
    out
}

pub fn format_outcome(outcome: &BacktestOutcome) -> String {
    let mut out = format_metrics("Strategy Results", &outcome.metrics);
    if let Some(baseline) = &outcome.baseline {
        out.push('\n');
        out.push_str(&format_metrics("Buy & Hold", baseline));
    }
    if let Some(comparison) = outcome.comparison() {
        let _ = writeln!(out, "\n=== Comparison ===");
        for line in comparison.narrative() {
            let _ = writeln!(out, "{}", line);
        }
    }
    let _ = writeln!(out, "\n=== Trades ({}) ===", outcome.trades.len());
    out.push_str(&format_trades(&outcome.trades));
    if !outcome.warnings.is_empty() {
        let _ = writeln!(out, "\n{} trade record(s) filtered out", outcome.warnings.len());
    }
    out
}

fn run_validate(strategy_path: &Path) -> Result<(), StratbenchError> {
    init_logging(&default_logging());
    eprintln!("Validating strategy: {}", strategy_path.display());
    let model = read_strategy_file(strategy_path)?;
    model.validate()?;

    for ind in model.indicators() {
        if !indicator::is_known(&ind.indicator_type) {
            warn!(indicator = %ind.indicator_type, "indicator type is not in the registry");
        }
    }
    for condition in model.dangling_references() {
        warn!(
            indicator = condition.indicator_type().unwrap_or_default(),
            "condition references an indicator that is not in the set"
        );
    }

    println!("{}", format_strategy(&model));
    eprintln!("Strategy configuration is valid.");
    Ok(())
}

fn run_reconstruct(events_path: &Path) -> Result<(), StratbenchError> {
    init_logging(&default_logging());
    let adapter = CsvEventAdapter::new(events_path);
    let events = adapter.read_events()?;
    let trades = reconstruct(&events);
    eprintln!(
        "Reconstructed {} trade(s) from {} event(s)",
        trades.len(),
        events.len()
    );
    print!("{}", format_trades(&trades));
    Ok(())
}

fn run_interpret(response_path: &Path) -> Result<(), StratbenchError> {
    init_logging(&default_logging());
    let content = fs::read_to_string(response_path)?;
    let raw: Value = serde_json::from_str(&content)?;
    let outcome = interpret_response(&raw)?;
    print!("{}", format_outcome(&outcome));
    Ok(())
}

/// Open the configured strategy store.
pub fn build_store(config: &StoreConfig) -> Result<Box<dyn StrategyStorePort>, StratbenchError> {
    match config {
        #[cfg(feature = "http")]
        StoreConfig::Http(service) => Ok(Box::new(
            crate::adapters::http_adapter::HttpServiceAdapter::new(service),
        )),
        #[cfg(feature = "sqlite")]
        StoreConfig::Sqlite(sqlite) => Ok(Box::new(
            crate::adapters::sqlite_adapter::SqliteStrategyStore::from_config(sqlite)?,
        )),
        #[allow(unreachable_patterns)]
        _ => Err(StratbenchError::ConfigInvalid {
            section: "store".to_string(),
            key: "backend".to_string(),
            reason: "backend is not compiled into this build".to_string(),
        }),
    }
}

/// Submit the session's strategy, print the results and optionally save them.
/// Returns the saved id when a name was given.
pub async fn run_backtest_pipeline(
    session: &mut StrategySession,
    port: &dyn BacktestPort,
    store: Option<&dyn StrategyStorePort>,
    timeframe: Timeframe,
    save_as: Option<(&str, &str)>,
) -> Result<Option<String>, StratbenchError> {
    eprintln!(
        "Running backtest: {} indicator(s), period {}, interval {}",
        session.model().indicators().len(),
        timeframe.period,
        timeframe.interval
    );
    let outcome = session.run_backtest(port, timeframe).await?;
    print!("{}", format_outcome(outcome));

    match (store, save_as) {
        (Some(store), Some((name, description))) => {
            let id = session.save(store, name, description).await?;
            eprintln!("Saved strategy '{}' with id {}", name.trim(), id);
            Ok(Some(id))
        }
        _ => Ok(None),
    }
}

fn run_backtest(
    config_path: &Path,
    strategy_path: &Path,
    period: Option<&str>,
    interval: Option<&str>,
    save: Option<&str>,
    description: &str,
) -> Result<(), StratbenchError> {
    let config = load_config(config_path)?;
    let service = config_validation::validate_service_config(&config)?;
    let timeframe = build_timeframe(&config, period, interval)?;
    let store = match save {
        Some(_) => Some(build_store(&config_validation::validate_store_config(&config)?)?),
        None => None,
    };

    eprintln!("Loading strategy from {}", strategy_path.display());
    let mut session = StrategySession::with_model(read_strategy_file(strategy_path)?);

    #[cfg(feature = "http")]
    {
        let port = crate::adapters::http_adapter::HttpServiceAdapter::new(&service);
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(run_backtest_pipeline(
            &mut session,
            &port,
            store.as_deref(),
            timeframe,
            save.map(|name| (name, description)),
        ))?;
        Ok(())
    }

    #[cfg(not(feature = "http"))]
    {
        let _ = (service, timeframe, store, description, &mut session);
        Err(StratbenchError::Network {
            reason: "http feature is required for backtest".to_string(),
        })
    }
}

fn run_load(config_path: &Path, id: &str) -> Result<(), StratbenchError> {
    let config = load_config(config_path)?;
    let store = build_store(&config_validation::validate_store_config(&config)?)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let mut session = StrategySession::new();
    let run = runtime.block_on(session.load(store.as_ref(), id))?;

    eprintln!(
        "Loaded strategy {} (period {}, interval {})",
        id, run.request.timeframe.period, run.request.timeframe.interval
    );
    println!("{}", format_strategy(session.model()));
    if let Some(run) = session.last_run() {
        print!("{}", format_outcome(&run.outcome));
    }
    Ok(())
}
