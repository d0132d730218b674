use super::decision::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An executed trade as reported by the execution simulator.
///
/// `quantity` is signed: positive buys, negative sells. `fees` are always
/// non-negative and are charged on top of the traded notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Feed sequence number of the event the fill executed at.
    pub sequence: usize,
    pub timestamp: DateTime<Utc>,
    /// Timestamp of the event whose decision produced this fill.
    pub decision_timestamp: DateTime<Utc>,
    pub instrument_id: String,
    pub quantity: f64,
    pub price: f64,
    pub fees: f64,
}

impl Fill {
    pub fn side(&self) -> OrderSide {
        OrderSide::from_signed(self.quantity)
    }

    /// Absolute traded value, excluding fees.
    pub fn notional(&self) -> f64 {
        self.quantity.abs() * self.price
    }

    /// Signed cash movement caused by the fill (negative for buys).
    pub fn cash_delta(&self) -> f64 {
        -(self.quantity * self.price) - self.fees
    }
}
