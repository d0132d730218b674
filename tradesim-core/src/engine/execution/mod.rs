//! Execution simulator: turns a pending decision into a fill or a rejection.
//!
//! The simulator never touches the ledger. It reads the position and cash it
//! is given, and the runner applies whatever `Fill` comes back. Checks run in
//! a fixed order so that the same inputs always produce the same rejection:
//!
//! 1. Instrument is tradeable in this run
//! 2. Execution price is positive and finite
//! 3. Required quantity is non-zero (otherwise a no-op, not a rejection)
//! 4. Seeded jitter moves the price adversely (if configured)
//! 5. Limit condition against the execution price
//! 6. Volume cap from the fill policy
//! 7. Lot rounding toward zero
//! 8. Short and cash constraints, fees included

pub mod cost_model;
pub mod fill_policy;

pub use cost_model::{FeeModel, JitterSource, PriceJitter};
pub use fill_policy::FillPolicy;

use crate::domain::instrument::is_below_lot;
use crate::domain::{Decision, Fill, MarketEvent, OrderSide, Position, Universe, QUANTITY_EPSILON};
use crate::error::Rejection;
use serde::{Deserialize, Serialize};

/// Configuration for the execution simulator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub fee_model: FeeModel,
    #[serde(default)]
    pub fill_policy: FillPolicy,
    #[serde(default)]
    pub short_allowed: bool,
    #[serde(default)]
    pub jitter: Option<PriceJitter>,
}

impl ExecutionConfig {
    pub fn frictionless() -> Self {
        Self::default()
    }

    pub fn with_fees(fee_model: FeeModel) -> Self {
        Self {
            fee_model,
            ..Self::default()
        }
    }
}

/// The execution simulator.
///
/// Holds only configuration plus the jitter RNG streams, which advance with
/// each jittered fill.
#[derive(Debug)]
pub struct ExecutionSimulator {
    config: ExecutionConfig,
    universe: Universe,
    jitter: Option<JitterSource>,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig, universe: Universe) -> Self {
        let jitter = config.jitter.map(JitterSource::new);
        Self {
            config,
            universe,
            jitter,
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Simulate executing `decision` at `market`.
    ///
    /// Returns `Ok(None)` when the decision requires no trade (zero quantity
    /// or target already reached). `sequence` is the feed index of `market`.
    pub fn simulate(
        &mut self,
        decision: &Decision,
        market: &MarketEvent,
        sequence: usize,
        position: &Position,
        cash: f64,
    ) -> Result<Option<Fill>, Rejection> {
        let instrument = match self.universe.get(&decision.instrument_id) {
            Some(i) if market.instrument_id == decision.instrument_id => i,
            _ => {
                return Err(Rejection::UnknownInstrument {
                    instrument_id: decision.instrument_id.clone(),
                })
            }
        };

        if !market.has_valid_price() {
            return Err(Rejection::NonPositivePrice {
                price: market.price,
            });
        }

        let requested = decision.required_quantity(position.quantity, market.price);
        if requested.abs() <= QUANTITY_EPSILON {
            return Ok(None);
        }
        let side = OrderSide::from_signed(requested);

        let price = match self.jitter.as_mut() {
            Some(src) => src.apply(&market.instrument_id, market.price, side),
            None => market.price,
        };

        if let Some(limit_price) = decision.limit_price() {
            let marketable = match side {
                OrderSide::Buy => price <= limit_price,
                OrderSide::Sell => price >= limit_price,
            };
            if !marketable {
                return Err(Rejection::LimitNotReached { limit_price, price });
            }
        }

        let (capped, dropped) = self
            .config
            .fill_policy
            .constrain(requested.abs(), market.volume);
        if capped <= QUANTITY_EPSILON {
            return Err(Rejection::NoLiquidity {
                volume: market.volume,
                cap: self.config.fill_policy.cap().unwrap_or(1.0),
            });
        }
        if dropped > 0.0 {
            tracing::debug!(
                instrument = %market.instrument_id,
                sequence,
                dropped,
                "volume cap bound, remainder dropped"
            );
        }

        let rounded = instrument.round_quantity(capped);
        if is_below_lot(rounded) {
            return Err(Rejection::BelowLotSize {
                quantity: capped,
                lot_size: instrument.lot_size.unwrap_or(0.0),
            });
        }

        let quantity = side.sign() * rounded;
        let fees = self.config.fee_model.fees(rounded * price);

        if !self.config.short_allowed {
            let resulting = position.quantity + quantity;
            if resulting < -QUANTITY_EPSILON {
                return Err(Rejection::ShortNotAllowed {
                    position: position.quantity,
                    requested: quantity,
                });
            }
            let required = quantity * price + fees;
            if cash - required < -QUANTITY_EPSILON {
                return Err(Rejection::InsufficientCash {
                    required,
                    available: cash,
                });
            }
        }

        Ok(Some(Fill {
            sequence,
            timestamp: market.timestamp,
            decision_timestamp: decision.timestamp,
            instrument_id: market.instrument_id.clone(),
            quantity,
            price,
            fees,
        }))
    }
}
