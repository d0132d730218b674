//! Parameter sweep over moving-average periods and fee models.

use rayon::prelude::*;
use tracing::info;

use tradesim_core::data::MarketDataFeed;
use tradesim_core::engine::FeeModel;

use crate::config::{BacktestConfig, StrategyConfig};
use crate::runner::{run_from_config, BacktestResult, RunError};

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
    pub fee_models: Vec<FeeModel>,
    /// Position size used by every generated `ma_cross` strategy.
    pub quantity: f64,
}

impl ParamGrid {
    /// Fast 10/20/30 × slow 50/100/200, frictionless and 10 bps.
    pub fn ma_cross_default(quantity: f64) -> Self {
        Self {
            fast_periods: vec![10, 20, 30],
            slow_periods: vec![50, 100, 200],
            fee_models: vec![FeeModel::None, FeeModel::Proportional { rate: 0.001 }],
            quantity,
        }
    }

    /// Number of valid configurations (fast < slow).
    pub fn size(&self) -> usize {
        let pairs = self
            .fast_periods
            .iter()
            .flat_map(|f| self.slow_periods.iter().map(move |s| (f, s)))
            .filter(|(f, s)| f < s)
            .count();
        pairs * self.fee_models.len()
    }

    /// All configurations in the grid, fast-major order.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                // Skip invalid combinations (fast >= slow)
                if fast >= slow {
                    continue;
                }
                for &fee_model in &self.fee_models {
                    let mut config = base.clone();
                    config.strategy = StrategyConfig::MaCross {
                        fast,
                        slow,
                        quantity: self.quantity,
                    };
                    config.execution.fee_model = fee_model;
                    configs.push(config);
                }
            }
        }
        configs
    }
}

/// One row of a sweep.
#[derive(Debug, Clone)]
pub struct SweepEntry {
    pub label: String,
    pub fee_model: FeeModel,
    pub result: BacktestResult,
}

/// Runs every configuration of a grid against one feed.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run the grid. Entries come back in `generate_configs` order whether
    /// or not the runs were parallel; the first failing config fails the sweep.
    pub fn run(
        &self,
        grid: &ParamGrid,
        base: &BacktestConfig,
        feed: &dyn MarketDataFeed,
    ) -> Result<Vec<SweepEntry>, RunError> {
        let configs = grid.generate_configs(base);
        info!(
            runs = configs.len(),
            parallel = self.parallel,
            feed = feed.name(),
            "starting sweep"
        );

        let run_one = |config: &BacktestConfig| -> Result<SweepEntry, RunError> {
            let result = run_from_config(config, feed)?;
            Ok(SweepEntry {
                label: config.strategy.label(),
                fee_model: config.execution.fee_model,
                result,
            })
        };

        if self.parallel {
            configs.par_iter().map(run_one).collect()
        } else {
            configs.iter().map(run_one).collect()
        }
    }
}

/// Indices of `entries` sorted by total return, best first. Ties keep grid order.
pub fn rank_by_return(entries: &[SweepEntry]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = entries[a].result.summary.total_return;
        let rb = entries[b].result.summary.total_return;
        rb.total_cmp(&ra)
    });
    order
}
