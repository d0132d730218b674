//! Instrument metadata and the set of instruments a run may trade.

use super::QUANTITY_EPSILON;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tradeable instrument.
///
/// `lot_size` of `None` means fractional quantities are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    #[serde(default)]
    pub lot_size: Option<f64>,
}

impl Instrument {
    pub fn fractional(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lot_size: None,
        }
    }

    pub fn with_lot_size(id: impl Into<String>, lot_size: f64) -> Self {
        Self {
            id: id.into(),
            lot_size: Some(lot_size),
        }
    }

    /// Round an absolute quantity down to a whole number of lots.
    pub fn round_quantity(&self, quantity: f64) -> f64 {
        match self.lot_size {
            Some(lot) if lot > 0.0 => {
                // Tolerate float noise just below a lot boundary.
                let lots = (quantity / lot + 1e-9).floor();
                lots * lot
            }
            _ => quantity,
        }
    }
}

/// Instruments known to a run.
///
/// An empty universe accepts every instrument as fractional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    instruments: BTreeMap<String, Instrument>,
}

impl Universe {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            instruments: instruments
                .into_iter()
                .map(|i| (i.id.clone(), i))
                .collect(),
        }
    }

    /// Universe that accepts every instrument.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn contains(&self, instrument_id: &str) -> bool {
        self.is_open() || self.instruments.contains_key(instrument_id)
    }

    /// Look up an instrument. Open universes synthesise a fractional one.
    pub fn get(&self, instrument_id: &str) -> Option<Instrument> {
        if self.is_open() {
            return Some(Instrument::fractional(instrument_id));
        }
        self.instruments.get(instrument_id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// Whether a rounded quantity is too small to trade.
pub fn is_below_lot(quantity: f64) -> bool {
    quantity.abs() <= QUANTITY_EPSILON
}
