//! Decisions emitted by a signal engine.
//!
//! A decision is an intent, not a fill. It is queued by the runner and handed
//! to the execution simulator at a later market event for the same
//! instrument.

use super::QUANTITY_EPSILON;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side implied by a signed quantity. Zero maps to `Buy`.
    pub fn from_signed(quantity: f64) -> Self {
        if quantity < 0.0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// Price condition attached to an explicit order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderType {
    /// Fill at whatever price the fill policy produces.
    Market,
    /// Fill only if the execution price is at or better than `limit_price`.
    /// Limit orders live for a single execution attempt.
    Limit { limit_price: f64 },
}

/// What the signal engine wants done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionKind {
    /// Bring the position to exactly `quantity` (signed).
    TargetQuantity { quantity: f64 },
    /// Bring the position to a market value of `notional` (signed), sized at
    /// the execution price.
    TargetNotional { notional: f64 },
    /// Trade `quantity` (signed, positive buys) on top of the current position.
    Order { quantity: f64, order_type: OrderType },
}

/// An intent produced by a signal engine at a specific event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Timestamp of the event that produced the decision.
    pub timestamp: DateTime<Utc>,
    pub instrument_id: String,
    pub kind: DecisionKind,
}

impl Decision {
    pub fn target_quantity(
        timestamp: DateTime<Utc>,
        instrument_id: impl Into<String>,
        quantity: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument_id: instrument_id.into(),
            kind: DecisionKind::TargetQuantity { quantity },
        }
    }

    pub fn target_notional(
        timestamp: DateTime<Utc>,
        instrument_id: impl Into<String>,
        notional: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument_id: instrument_id.into(),
            kind: DecisionKind::TargetNotional { notional },
        }
    }

    pub fn market(
        timestamp: DateTime<Utc>,
        instrument_id: impl Into<String>,
        quantity: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument_id: instrument_id.into(),
            kind: DecisionKind::Order {
                quantity,
                order_type: OrderType::Market,
            },
        }
    }

    pub fn limit(
        timestamp: DateTime<Utc>,
        instrument_id: impl Into<String>,
        quantity: f64,
        limit_price: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument_id: instrument_id.into(),
            kind: DecisionKind::Order {
                quantity,
                order_type: OrderType::Limit { limit_price },
            },
        }
    }

    pub fn limit_price(&self) -> Option<f64> {
        match self.kind {
            DecisionKind::Order {
                order_type: OrderType::Limit { limit_price },
                ..
            } => Some(limit_price),
            _ => None,
        }
    }

    /// An explicit order for zero quantity can never trade.
    ///
    /// Target decisions are only known to be no-ops once the position at
    /// execution time is known.
    pub fn is_empty_order(&self) -> bool {
        matches!(self.kind, DecisionKind::Order { quantity, .. } if quantity.abs() <= QUANTITY_EPSILON)
    }

    /// True when every numeric field is finite.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            DecisionKind::TargetQuantity { quantity } => quantity.is_finite(),
            DecisionKind::TargetNotional { notional } => notional.is_finite(),
            DecisionKind::Order {
                quantity,
                order_type,
            } => {
                quantity.is_finite()
                    && match order_type {
                        OrderType::Market => true,
                        OrderType::Limit { limit_price } => {
                            limit_price.is_finite() && limit_price > 0.0
                        }
                    }
            }
        }
    }

    /// Signed quantity needed to carry out this decision given the current
    /// position and the price the trade would execute at.
    pub fn required_quantity(&self, current_position: f64, price: f64) -> f64 {
        match self.kind {
            DecisionKind::TargetQuantity { quantity } => quantity - current_position,
            DecisionKind::TargetNotional { notional } => {
                if price > 0.0 {
                    notional / price - current_position
                } else {
                    0.0
                }
            }
            DecisionKind::Order { quantity, .. } => quantity,
        }
    }
}
