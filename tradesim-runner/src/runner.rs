//! Backtest runner: wires together configuration, feed, strategy and engine.
//!
//! Entry points:
//! - `run_files()`: loads a config file and a CSV feed, then runs. Used by the CLI.
//! - `run_from_config()`: takes a parsed config and any feed. Used by sweeps.
//! - `run_with_strategy()`: caller supplies the signal engine and an optional
//!   stop flag.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use tradesim_core::data::{FeedError, MarketDataFeed};
use tradesim_core::engine::{BacktestRunner, RunReport, StopFlag};
use tradesim_core::fingerprint::RunFingerprint;
use tradesim_core::signals::{SignalEngine, SignalError};

use crate::config::{BacktestConfig, ConfigError};
use crate::csv_feed::CsvFeed;
use crate::factory::build_strategy;
use crate::summary::RunSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("strategy error: {0}")]
    Strategy(#[from] SignalError),
    #[error("data error: {0}")]
    Data(#[from] FeedError),
    #[error("failed to hash run output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run, completed or aborted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    pub config: BacktestConfig,
    pub summary: RunSummary,
    pub report: RunReport,
}

impl BacktestResult {
    pub fn is_completed(&self) -> bool {
        self.report.is_completed()
    }
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run the backtest described by a config file against a CSV feed.
pub fn run_files(config_path: &Path, data_path: &Path) -> Result<BacktestResult, RunError> {
    let config = BacktestConfig::from_file(config_path)?;
    let feed = CsvFeed::new(data_path);
    run_from_config(&config, &feed)
}

/// Run a validated config against `feed`.
pub fn run_from_config(
    config: &BacktestConfig,
    feed: &dyn MarketDataFeed,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let strategy = build_strategy(&config.strategy)?;
    run_with_strategy(config, feed, strategy.as_ref(), None)
}

/// Run with a caller-supplied signal engine.
///
/// The feed is hashed before the run starts, so an unreadable feed is an
/// error here rather than an aborted run.
pub fn run_with_strategy(
    config: &BacktestConfig,
    feed: &dyn MarketDataFeed,
    strategy: &dyn SignalEngine,
    stop: Option<StopFlag>,
) -> Result<BacktestResult, RunError> {
    let dataset_hash = feed.dataset_hash()?;
    let fingerprint = RunFingerprint::new(
        config.config_hash()?,
        dataset_hash,
        config.seed(),
        strategy.name(),
    );
    info!(
        run = %fingerprint.run_id,
        feed = feed.name(),
        strategy = strategy.name(),
        "starting backtest"
    );

    let mut runner = BacktestRunner::new(config.to_engine_config());
    if let Some(stop) = stop {
        runner = runner.with_stop_flag(stop);
    }
    let report = runner.run(feed, strategy);
    let fingerprint = fingerprint.with_output(&report)?;
    let summary = RunSummary::from_report(&report);

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        config: config.clone(),
        summary,
        report,
    })
}
