//! Fill policies: when a decision executes and how much of it can fill.
//!
//! Every policy fills at the next market event for the decision's instrument.
//! The capped variant additionally limits the fill to a fraction of that
//! event's volume; the unfilled remainder is dropped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FillPolicy {
    /// Fill the full quantity at the next event's price.
    #[default]
    NextPrice,
    /// Fill at most `cap × volume` at the next event's price.
    NextPriceCapped { cap: f64 },
}

impl FillPolicy {
    pub fn cap(&self) -> Option<f64> {
        match *self {
            FillPolicy::NextPrice => None,
            FillPolicy::NextPriceCapped { cap } => Some(cap),
        }
    }

    /// Maximum fillable quantity given event volume.
    pub fn max_fill_qty(&self, volume: f64) -> f64 {
        match *self {
            FillPolicy::NextPrice => f64::INFINITY,
            FillPolicy::NextPriceCapped { cap } => volume.max(0.0) * cap,
        }
    }

    /// Apply the volume constraint to an absolute desired quantity.
    ///
    /// Returns `(fill_qty, dropped_qty)`. If no constraint binds,
    /// `dropped_qty` is zero.
    pub fn constrain(&self, desired_qty: f64, volume: f64) -> (f64, f64) {
        let max_qty = self.max_fill_qty(volume);
        if desired_qty <= max_qty {
            (desired_qty, 0.0)
        } else {
            (max_qty, desired_qty - max_qty)
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            FillPolicy::NextPrice => true,
            FillPolicy::NextPriceCapped { cap } => cap.is_finite() && cap > 0.0 && cap <= 1.0,
        }
    }
}
