//! Strategy factory: builds a signal engine from its configuration.

use chrono::Duration;

use tradesim_core::signals::examples::{MovingAverageCross, PeriodicRebalance, ScheduledDecisions};
use tradesim_core::signals::{SignalEngine, SignalError};

use crate::config::StrategyConfig;

/// Build the signal engine described by `config`.
pub fn build_strategy(config: &StrategyConfig) -> Result<Box<dyn SignalEngine>, SignalError> {
    match config {
        StrategyConfig::MaCross {
            fast,
            slow,
            quantity,
        } => Ok(Box::new(MovingAverageCross::new(*fast, *slow, *quantity)?)),
        StrategyConfig::PeriodicRebalance {
            weights,
            fund_size,
            rebalance_days,
        } => {
            let period = Duration::try_days(*rebalance_days).ok_or_else(|| {
                SignalError::InvalidParameter {
                    name: "rebalance_days",
                    reason: format!("{rebalance_days} is out of range"),
                }
            })?;
            Ok(Box::new(PeriodicRebalance::new(
                weights.clone(),
                *fund_size,
                period,
            )?))
        }
        StrategyConfig::Scheduled { decisions } => Ok(Box::new(decisions.iter().fold(
            ScheduledDecisions::new(),
            |schedule, entry| schedule.at(entry.index, entry.instrument_id.clone(), entry.kind.clone()),
        ))),
    }
}
