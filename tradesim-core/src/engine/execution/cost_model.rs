//! Cost model: fee schedules and seeded adverse price jitter.
//!
//! Fees are computed on the absolute traded notional and charged as cash on
//! top of the trade. Jitter moves the execution price against the trader by
//! a random fraction of `max_bps` drawn from a per-instrument seeded RNG.

use crate::domain::OrderSide;
use crate::rng::RngHierarchy;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fee schedule applied to every fill.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeModel {
    /// Frictionless.
    #[default]
    None,
    /// Fixed amount per fill.
    Flat { amount: f64 },
    /// Fraction of notional, e.g. `0.001` for 10 bps.
    Proportional { rate: f64 },
    /// Basis points of notional.
    SlippageBps { bps: f64 },
}

impl FeeModel {
    /// Fees for a fill of the given absolute notional.
    pub fn fees(&self, notional: f64) -> f64 {
        let notional = notional.abs();
        match *self {
            FeeModel::None => 0.0,
            FeeModel::Flat { amount } => amount,
            FeeModel::Proportional { rate } => notional * rate,
            FeeModel::SlippageBps { bps } => notional * bps / 10_000.0,
        }
    }

    /// Short label for sweep tables and logs.
    pub fn label(&self) -> String {
        match *self {
            FeeModel::None => "none".into(),
            FeeModel::Flat { amount } => format!("flat({amount})"),
            FeeModel::Proportional { rate } => format!("proportional({rate})"),
            FeeModel::SlippageBps { bps } => format!("slippage_bps({bps})"),
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            FeeModel::None => true,
            FeeModel::Flat { amount } => amount.is_finite() && amount >= 0.0,
            FeeModel::Proportional { rate } => rate.is_finite() && (0.0..1.0).contains(&rate),
            FeeModel::SlippageBps { bps } => bps.is_finite() && (0.0..10_000.0).contains(&bps),
        }
    }
}

/// Seeded adverse price noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceJitter {
    pub max_bps: f64,
    pub seed: u64,
}

/// Per-instrument RNG streams for jitter.
///
/// Each instrument's stream is derived from the seed and the instrument id,
/// so the draws for one instrument do not depend on how events for other
/// instruments are interleaved.
#[derive(Debug)]
pub struct JitterSource {
    jitter: PriceJitter,
    hierarchy: RngHierarchy,
    streams: HashMap<String, StdRng>,
}

impl JitterSource {
    pub fn new(jitter: PriceJitter) -> Self {
        Self {
            jitter,
            hierarchy: RngHierarchy::new(jitter.seed),
            streams: HashMap::new(),
        }
    }

    /// Move `price` against `side` by a uniform draw in `[0, max_bps]`.
    /// A non-finite or non-positive `max_bps` leaves the price untouched.
    pub fn apply(&mut self, instrument_id: &str, price: f64, side: OrderSide) -> f64 {
        if !(self.jitter.max_bps.is_finite() && self.jitter.max_bps > 0.0) {
            return price;
        }
        let hierarchy = &self.hierarchy;
        let rng = self
            .streams
            .entry(instrument_id.to_string())
            .or_insert_with(|| hierarchy.rng_for("jitter", instrument_id, 0));
        let bps = rng.gen_range(0.0..=self.jitter.max_bps);
        let fraction = bps / 10_000.0;
        match side {
            OrderSide::Buy => price * (1.0 + fraction),
            OrderSide::Sell => price * (1.0 - fraction),
        }
    }
}
