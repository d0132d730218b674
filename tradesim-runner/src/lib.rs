//! tradesim runner: backtest orchestration on top of `tradesim-core`.
//!
//! This crate provides:
//! - TOML configuration with validation and a deterministic config hash
//! - A lazily-read CSV market data feed
//! - A strategy factory for the bundled signal engines
//! - Single-run orchestration with run fingerprints and summaries
//! - Parallel parameter sweeps
//! - JSON and CSV artifact export

pub mod config;
pub mod csv_feed;
pub mod export;
pub mod factory;
pub mod runner;
pub mod summary;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, StrategyConfig};
pub use csv_feed::CsvFeed;
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use factory::build_strategy;
pub use runner::{run_files, run_from_config, run_with_strategy, BacktestResult, RunError};
pub use summary::RunSummary;
pub use sweep::{rank_by_return, ParamGrid, ParamSweep, SweepEntry};
