//! Periodic weighted rebalance
//!
//! Holds a fixed dollar allocation across a basket: each instrument targets
//! `weight / Σweights × fund_size` of market value, re-sized on the first
//! event for that instrument in every rebalance window. Windows are counted
//! from the first event in history, so the decision depends only on the
//! prefix seen so far.

use crate::domain::{Decision, Position};
use crate::signals::{HistoryView, SignalEngine, SignalError};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct PeriodicRebalance {
    weights: BTreeMap<String, f64>,
    total_weight: f64,
    fund_size: f64,
    rebalance_every: Duration,
}

impl PeriodicRebalance {
    pub fn new(
        weights: BTreeMap<String, f64>,
        fund_size: f64,
        rebalance_every: Duration,
    ) -> Result<Self, SignalError> {
        if let Some((id, w)) = weights.iter().find(|(_, w)| !(w.is_finite() && **w >= 0.0)) {
            return Err(SignalError::InvalidParameter {
                name: "weights",
                reason: format!("weight for '{id}' must be non-negative, got {w}"),
            });
        }
        let total_weight: f64 = weights.values().sum();
        if total_weight <= 0.0 {
            return Err(SignalError::InvalidParameter {
                name: "weights",
                reason: "at least one weight must be positive".into(),
            });
        }
        if !(fund_size.is_finite() && fund_size > 0.0) {
            return Err(SignalError::InvalidParameter {
                name: "fund_size",
                reason: format!("must be positive, got {fund_size}"),
            });
        }
        if rebalance_every <= Duration::zero() {
            return Err(SignalError::InvalidParameter {
                name: "rebalance_every",
                reason: "must be a positive duration".into(),
            });
        }
        Ok(Self {
            weights,
            total_weight,
            fund_size,
            rebalance_every,
        })
    }

    /// Dollar allocation for an instrument, if it is part of the basket.
    pub fn allocation(&self, instrument_id: &str) -> Option<f64> {
        self.weights
            .get(instrument_id)
            .map(|w| w / self.total_weight * self.fund_size)
    }

    fn window(&self, origin: DateTime<Utc>, t: DateTime<Utc>) -> i64 {
        let elapsed = (t - origin).num_milliseconds();
        elapsed.div_euclid(self.rebalance_every.num_milliseconds().max(1))
    }
}

impl SignalEngine for PeriodicRebalance {
    fn decide(&self, history: HistoryView<'_>, _current_position: &Position) -> Option<Decision> {
        let now = history.now()?;
        let target = self.allocation(&now.instrument_id)?;
        let origin = history.events().first()?.timestamp;

        let due = match history.previous(&now.instrument_id) {
            None => true,
            Some(prev) => self.window(origin, prev.timestamp) < self.window(origin, now.timestamp),
        };
        if !due {
            return None;
        }

        Some(Decision::target_notional(
            now.timestamp,
            now.instrument_id.clone(),
            target,
        ))
    }

    fn name(&self) -> &str {
        "periodic_rebalance"
    }
}
