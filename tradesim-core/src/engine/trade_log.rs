//! Trade log entries and their flat export form.

use crate::domain::{Decision, DecisionKind, Fill};
use crate::error::Rejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a decision produced neither a fill nor a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// Decision names an instrument outside the run's universe.
    UnknownInstrument,
    /// Nothing to trade: zero quantity or target already held.
    ZeroQuantity,
    /// Non-finite quantities or a timestamp after the producing event.
    InvalidDecision,
}

impl NoOpReason {
    pub fn code(&self) -> &'static str {
        match self {
            NoOpReason::UnknownInstrument => "unknown_instrument",
            NoOpReason::ZeroQuantity => "zero_quantity",
            NoOpReason::InvalidDecision => "invalid_decision",
        }
    }
}

/// One line of the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeLogEntry {
    Fill {
        fill: Fill,
    },
    Rejected {
        sequence: usize,
        timestamp: DateTime<Utc>,
        decision: Decision,
        rejection: Rejection,
    },
    NoOp {
        sequence: usize,
        timestamp: DateTime<Utc>,
        decision: Decision,
        reason: NoOpReason,
    },
    /// A pending decision replaced by a newer one before it executed.
    Superseded {
        sequence: usize,
        timestamp: DateTime<Utc>,
        decision: Decision,
    },
}

impl TradeLogEntry {
    pub fn sequence(&self) -> usize {
        match self {
            TradeLogEntry::Fill { fill } => fill.sequence,
            TradeLogEntry::Rejected { sequence, .. }
            | TradeLogEntry::NoOp { sequence, .. }
            | TradeLogEntry::Superseded { sequence, .. } => *sequence,
        }
    }

    pub fn instrument_id(&self) -> &str {
        match self {
            TradeLogEntry::Fill { fill } => &fill.instrument_id,
            TradeLogEntry::Rejected { decision, .. }
            | TradeLogEntry::NoOp { decision, .. }
            | TradeLogEntry::Superseded { decision, .. } => &decision.instrument_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TradeLogEntry::Fill { .. } => "fill",
            TradeLogEntry::Rejected { .. } => "rejected",
            TradeLogEntry::NoOp { .. } => "no_op",
            TradeLogEntry::Superseded { .. } => "superseded",
        }
    }

    pub fn as_fill(&self) -> Option<&Fill> {
        match self {
            TradeLogEntry::Fill { fill } => Some(fill),
            _ => None,
        }
    }

    pub fn as_rejection(&self) -> Option<&Rejection> {
        match self {
            TradeLogEntry::Rejected { rejection, .. } => Some(rejection),
            _ => None,
        }
    }
}

/// Flat, CSV-friendly trade log row with stable field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub kind: String,
    pub sequence: usize,
    pub timestamp: DateTime<Utc>,
    pub instrument_id: String,
    /// Signed filled quantity, or the requested quantity for orders.
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub fees: Option<f64>,
    pub reason: String,
}

fn requested_quantity(decision: &Decision) -> Option<f64> {
    match decision.kind {
        DecisionKind::TargetQuantity { quantity } | DecisionKind::Order { quantity, .. } => {
            Some(quantity)
        }
        DecisionKind::TargetNotional { .. } => None,
    }
}

impl From<&TradeLogEntry> for TradeRecord {
    fn from(entry: &TradeLogEntry) -> Self {
        match entry {
            TradeLogEntry::Fill { fill } => TradeRecord {
                kind: entry.kind().into(),
                sequence: fill.sequence,
                timestamp: fill.timestamp,
                instrument_id: fill.instrument_id.clone(),
                quantity: Some(fill.quantity),
                price: Some(fill.price),
                fees: Some(fill.fees),
                reason: String::new(),
            },
            TradeLogEntry::Rejected {
                sequence,
                timestamp,
                decision,
                rejection,
            } => TradeRecord {
                kind: entry.kind().into(),
                sequence: *sequence,
                timestamp: *timestamp,
                instrument_id: decision.instrument_id.clone(),
                quantity: requested_quantity(decision),
                price: decision.limit_price(),
                fees: None,
                reason: format!("{}: {rejection}", rejection.code()),
            },
            TradeLogEntry::NoOp {
                sequence,
                timestamp,
                decision,
                reason,
            } => TradeRecord {
                kind: entry.kind().into(),
                sequence: *sequence,
                timestamp: *timestamp,
                instrument_id: decision.instrument_id.clone(),
                quantity: requested_quantity(decision),
                price: None,
                fees: None,
                reason: reason.code().into(),
            },
            TradeLogEntry::Superseded {
                sequence,
                timestamp,
                decision,
            } => TradeRecord {
                kind: entry.kind().into(),
                sequence: *sequence,
                timestamp: *timestamp,
                instrument_id: decision.instrument_id.clone(),
                quantity: requested_quantity(decision),
                price: None,
                fees: None,
                reason: "superseded".into(),
            },
        }
    }
}
