//! Error types shared by the execution simulator, ledger and runner.
//!
//! Two tiers:
//! - `Rejection`: an order that could not be carried out. Recorded in the
//!   trade log; the run continues.
//! - `EngineError`: everything the runner reports. Only `RejectedOrder` is
//!   recoverable; every other variant aborts the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an order produced no fill.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("price {price} is not a positive finite number")]
    NonPositivePrice { price: f64 },

    #[error("insufficient cash: required {required:.2}, available {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("short selling not allowed: position {position}, requested {requested}")]
    ShortNotAllowed { position: f64, requested: f64 },

    #[error("instrument '{instrument_id}' is not tradeable in this run")]
    UnknownInstrument { instrument_id: String },

    #[error("no liquidity: volume {volume} under participation cap {cap}")]
    NoLiquidity { volume: f64, cap: f64 },

    #[error("limit {limit_price} not reached at {price}")]
    LimitNotReached { limit_price: f64, price: f64 },

    #[error("quantity {quantity} rounds to zero with lot size {lot_size}")]
    BelowLotSize { quantity: f64, lot_size: f64 },

    #[error("fill is malformed: {message}")]
    MalformedFill { message: String },
}

impl Rejection {
    /// Short machine-readable code, used in CSV exports.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::NonPositivePrice { .. } => "non_positive_price",
            Rejection::InsufficientCash { .. } => "insufficient_cash",
            Rejection::ShortNotAllowed { .. } => "short_not_allowed",
            Rejection::UnknownInstrument { .. } => "unknown_instrument",
            Rejection::NoLiquidity { .. } => "no_liquidity",
            Rejection::LimitNotReached { .. } => "limit_not_reached",
            Rejection::BelowLotSize { .. } => "below_lot_size",
            Rejection::MalformedFill { .. } => "malformed_fill",
        }
    }
}

/// Snapshot of the accounting identity at the moment it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inconsistency {
    pub initial_capital: f64,
    pub cash: f64,
    pub position_value: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    /// `(cash + position_value) - (initial_capital + realized + unrealized)`.
    pub difference: f64,
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cash {:.6} + positions {:.6} != initial {:.6} + realized {:.6} + unrealized {:.6} (diff {:e})",
            self.cash,
            self.position_value,
            self.initial_capital,
            self.realized_pnl,
            self.unrealized_pnl,
            self.difference
        )
    }
}

/// Errors surfaced by the backtest runner.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum EngineError {
    #[error("event {sequence} at {timestamp} is earlier than the previous event at {previous}")]
    DataOrdering {
        sequence: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("unknown instrument '{instrument_id}'")]
    UnknownInstrument { instrument_id: String },

    #[error("order rejected: {rejection}")]
    RejectedOrder { rejection: Rejection },

    #[error("ledger inconsistency: {details}")]
    LedgerInconsistency { details: Inconsistency },

    #[error("market data feed failed: {message}")]
    Feed { message: String },

    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Fatal errors abort the run; recoverable ones are logged and skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::RejectedOrder { .. } | EngineError::UnknownInstrument { .. }
        )
    }
}

impl From<Rejection> for EngineError {
    fn from(rejection: Rejection) -> Self {
        EngineError::RejectedOrder { rejection }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_recoverable() {
        let err: EngineError = Rejection::NoLiquidity {
            volume: 0.0,
            cap: 0.1,
        }
        .into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn ordering_and_ledger_errors_are_fatal() {
        let ts = chrono::Utc::now();
        assert!(EngineError::DataOrdering {
            sequence: 3,
            timestamp: ts,
            previous: ts,
        }
        .is_fatal());
        assert!(EngineError::Cancelled.is_fatal());
    }

    #[test]
    fn rejection_display_is_readable() {
        let r = Rejection::InsufficientCash {
            required: 1020.0,
            available: 500.0,
        };
        assert_eq!(
            r.to_string(),
            "insufficient cash: required 1020.00, available 500.00"
        );
        assert_eq!(r.code(), "insufficient_cash");
    }

    #[test]
    fn rejection_serializes_with_reason_tag() {
        let r = Rejection::LimitNotReached {
            limit_price: 99.0,
            price: 101.0,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["reason"], "limit_not_reached");
    }
}
