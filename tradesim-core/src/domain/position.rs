use super::QUANTITY_EPSILON;
use serde::{Deserialize, Serialize};

/// Holdings of one instrument.
///
/// `average_cost` is `None` whenever the position is flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument_id: String,
    pub quantity: f64,
    pub average_cost: Option<f64>,
}

impl Position {
    pub fn flat(instrument_id: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            quantity: 0.0,
            average_cost: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.abs() <= QUANTITY_EPSILON
    }

    pub fn is_long(&self) -> bool {
        self.quantity > QUANTITY_EPSILON
    }

    pub fn is_short(&self) -> bool {
        self.quantity < -QUANTITY_EPSILON
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Book value at average cost.
    pub fn cost_basis(&self) -> f64 {
        self.average_cost.map_or(0.0, |avg| self.quantity * avg)
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.average_cost {
            Some(avg) => self.quantity * (price - avg),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_position_has_no_cost() {
        let p = Position::flat("ABC");
        assert!(p.is_flat());
        assert_eq!(p.average_cost, None);
        assert_eq!(p.unrealized_pnl(100.0), 0.0);
    }

    #[test]
    fn short_unrealized_gains_when_price_falls() {
        let p = Position {
            instrument_id: "ABC".into(),
            quantity: -5.0,
            average_cost: Some(100.0),
        };
        assert!(p.is_short());
        assert!((p.unrealized_pnl(90.0) - 50.0).abs() < 1e-10);
        assert!((p.cost_basis() + 500.0).abs() < 1e-10);
    }
}
