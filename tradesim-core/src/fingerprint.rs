//! Run fingerprinting: deterministic identification of runs and their outputs.
//!
//! - `ConfigHash`: BLAKE3 of the canonical JSON of a configuration.
//! - `DatasetHash`: BLAKE3 over every feed event (see `MarketDataFeed`).
//! - `OutputHash`: BLAKE3 of the trade log and equity curve.
//! - `RunFingerprint`: all of the above plus the seed and strategy name.

use crate::domain::{ConfigHash, DatasetHash, OutputHash, RunId};
use crate::engine::RunReport;
use serde::{Deserialize, Serialize};

/// Hash any serializable configuration.
///
/// Use `BTreeMap` for maps inside `config` so key order is deterministic.
pub fn config_hash<T: Serialize>(config: &T) -> Result<ConfigHash, serde_json::Error> {
    let json = serde_json::to_vec(config)?;
    Ok(ConfigHash::from_bytes(&json))
}

/// Complete fingerprint of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: RunId,
    pub strategy: String,
    /// Filled in once the run has finished.
    pub output_hash: Option<OutputHash>,
}

impl RunFingerprint {
    pub fn new(
        config_hash: ConfigHash,
        dataset_hash: DatasetHash,
        seed: u64,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            run_id: RunId::new(config_hash, dataset_hash, seed),
            strategy: strategy.into(),
            output_hash: None,
        }
    }

    /// Record the output hash of a finished run.
    pub fn with_output(mut self, report: &RunReport) -> Result<Self, serde_json::Error> {
        self.output_hash = Some(report.output_hash()?);
        Ok(self)
    }

    /// Stable hash of the run identity (not the output).
    pub fn run_hash(&self) -> String {
        self.run_id.hash()
    }

    /// `"<strategy>_<first 12 hex chars of run hash>"`, used for output directories.
    pub fn label(&self) -> String {
        let hash = self.run_hash();
        let short = &hash[..12.min(hash.len())];
        let strategy: String = self
            .strategy
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        format!("{strategy}_{short}")
    }
}
