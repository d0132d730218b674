//! MarketEvent: one timestamped observation of an instrument's price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single price/volume observation for one instrument.
///
/// Events are immutable once produced by a feed. The runner requires that
/// timestamps are non-decreasing across the whole feed; events sharing a
/// timestamp are processed in feed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp: DateTime<Utc>,
    pub instrument_id: String,
    pub price: f64,
    pub volume: f64,
}

impl MarketEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        instrument_id: impl Into<String>,
        price: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument_id: instrument_id.into(),
            price,
            volume,
        }
    }

    /// True when the price is finite and strictly positive.
    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}
