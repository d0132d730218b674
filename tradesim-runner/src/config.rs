//! TOML backtest configuration.
//!
//! ```toml
//! [backtest]
//! initial_capital = 100000.0
//!
//! [[instruments]]
//! id = "SPY"
//! lot_size = 1.0
//!
//! [execution]
//! short_allowed = false
//! fee_model = { type = "proportional", rate = 0.001 }
//! fill_policy = { type = "next_price_capped", cap = 0.1 }
//!
//! [strategy]
//! type = "ma_cross"
//! fast = 10
//! slow = 50
//! quantity = 100.0
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use tradesim_core::domain::{ConfigHash, DecisionKind, Instrument, Universe};
use tradesim_core::engine::{EngineConfig, ExecutionConfig};
use tradesim_core::fingerprint::config_hash;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to hash config: {0}")]
    Hash(#[from] serde_json::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Full configuration of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    /// Tradeable instruments. Empty means every feed instrument is accepted.
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub initial_capital: f64,
}

/// Strategy selection (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Long `quantity` while the fast SMA is above the slow SMA.
    MaCross {
        fast: usize,
        slow: usize,
        quantity: f64,
    },

    /// Target `weight / Σweights × fund_size` per instrument every
    /// `rebalance_days`.
    PeriodicRebalance {
        weights: BTreeMap<String, f64>,
        fund_size: f64,
        rebalance_days: i64,
    },

    /// Fixed decisions at given event indices.
    Scheduled { decisions: Vec<ScheduledEntry> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    pub index: usize,
    pub instrument_id: String,
    pub kind: DecisionKind,
}

impl StrategyConfig {
    /// Short name for logs and sweep tables.
    pub fn label(&self) -> String {
        match self {
            StrategyConfig::MaCross { fast, slow, .. } => format!("ma_cross_{fast}_{slow}"),
            StrategyConfig::PeriodicRebalance { rebalance_days, .. } => {
                format!("rebalance_{rebalance_days}d")
            }
            StrategyConfig::Scheduled { .. } => "scheduled".into(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StrategyConfig::MaCross {
                fast,
                slow,
                quantity,
            } => {
                if *fast == 0 {
                    return Err(invalid("strategy.fast", "must be > 0"));
                }
                if slow <= fast {
                    return Err(invalid(
                        "strategy.slow",
                        format!("{slow} must exceed fast period {fast}"),
                    ));
                }
                if !(quantity.is_finite() && *quantity > 0.0) {
                    return Err(invalid("strategy.quantity", format!("{quantity} must be > 0")));
                }
            }
            StrategyConfig::PeriodicRebalance {
                weights,
                fund_size,
                rebalance_days,
            } => {
                if weights.is_empty() {
                    return Err(invalid("strategy.weights", "at least one weight required"));
                }
                if let Some((id, w)) = weights.iter().find(|(_, w)| !(w.is_finite() && **w >= 0.0)) {
                    return Err(invalid("strategy.weights", format!("{id} has weight {w}")));
                }
                if !(fund_size.is_finite() && *fund_size > 0.0) {
                    return Err(invalid("strategy.fund_size", format!("{fund_size} must be > 0")));
                }
                if *rebalance_days <= 0 {
                    return Err(invalid("strategy.rebalance_days", "must be > 0"));
                }
                if Duration::try_days(*rebalance_days).is_none() {
                    return Err(invalid(
                        "strategy.rebalance_days",
                        format!("{rebalance_days} is out of range"),
                    ));
                }
            }
            StrategyConfig::Scheduled { decisions } => {
                if let Some(d) = decisions.iter().find(|d| d.instrument_id.is_empty()) {
                    return Err(invalid(
                        "strategy.decisions",
                        format!("empty instrument_id at index {}", d.index),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl BacktestConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capital = self.backtest.initial_capital;
        if !(capital.is_finite() && capital > 0.0) {
            return Err(invalid("backtest.initial_capital", format!("{capital} must be > 0")));
        }

        let mut seen = BTreeSet::new();
        for instrument in &self.instruments {
            if instrument.id.is_empty() {
                return Err(invalid("instruments.id", "must not be empty"));
            }
            if !seen.insert(instrument.id.as_str()) {
                return Err(invalid("instruments.id", format!("duplicate '{}'", instrument.id)));
            }
            if let Some(lot) = instrument.lot_size {
                if !(lot.is_finite() && lot > 0.0) {
                    return Err(invalid(
                        "instruments.lot_size",
                        format!("{} has lot size {lot}", instrument.id),
                    ));
                }
            }
        }

        if !self.execution.fee_model.is_valid() {
            return Err(invalid(
                "execution.fee_model",
                self.execution.fee_model.label(),
            ));
        }
        if !self.execution.fill_policy.is_valid() {
            return Err(invalid(
                "execution.fill_policy",
                format!("{:?}", self.execution.fill_policy),
            ));
        }
        if let Some(jitter) = &self.execution.jitter {
            if !(jitter.max_bps.is_finite() && (0.0..10_000.0).contains(&jitter.max_bps)) {
                return Err(invalid(
                    "execution.jitter.max_bps",
                    format!("{} out of range", jitter.max_bps),
                ));
            }
        }

        self.strategy.validate()
    }

    /// The only randomness in a run is price jitter, so its seed is the run seed.
    pub fn seed(&self) -> u64 {
        self.execution.jitter.map_or(0, |j| j.seed)
    }

    pub fn universe(&self) -> Universe {
        Universe::new(self.instruments.iter().cloned())
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.backtest.initial_capital)
            .with_execution(self.execution.clone())
            .with_universe(self.universe())
    }

    /// BLAKE3 of the canonical JSON form.
    pub fn config_hash(&self) -> Result<ConfigHash, ConfigError> {
        Ok(config_hash(self)?)
    }
}
