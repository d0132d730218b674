//! Position ledger: the single authority on holdings, cash and PnL.
//!
//! The ledger changes only through `apply` (a confirmed fill) and `mark`
//! (a new reference price). After each change it recomputes equity two
//! independent ways and fails hard if they disagree:
//!
//! - `cash + Σ quantity × mark`
//! - `initial_capital + realized_pnl + unrealized_pnl`
//!
//! Fees reduce cash and are booked into `realized_pnl`, so the identity holds
//! with fees present.

use crate::domain::{Fill, Position, QUANTITY_EPSILON};
use crate::error::{EngineError, Inconsistency, Rejection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Relative tolerance for the equity identity.
pub const LEDGER_TOLERANCE: f64 = 1e-6;

/// Snapshot of everything the ledger knows.
///
/// `BTreeMap` keeps iteration and serialization order stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub initial_capital: f64,
    pub cash: f64,
    pub positions: BTreeMap<String, Position>,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub fees_paid: f64,
    /// Last reference price per instrument.
    pub marks: BTreeMap<String, f64>,
}

impl LedgerState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            fees_paid: 0.0,
            marks: BTreeMap::new(),
        }
    }

    /// Positions with non-zero quantity, in instrument order.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| !p.is_flat())
    }

    /// Mark for a position; falls back to average cost before the first mark.
    pub fn mark_for(&self, position: &Position) -> f64 {
        self.marks
            .get(&position.instrument_id)
            .copied()
            .or(position.average_cost)
            .unwrap_or(0.0)
    }

    /// Σ quantity × mark over open positions.
    pub fn position_value(&self) -> f64 {
        self.open_positions()
            .map(|p| p.market_value(self.mark_for(p)))
            .sum()
    }

    /// Total equity: cash plus marked position value.
    pub fn equity(&self) -> f64 {
        self.cash + self.position_value()
    }

    pub fn total_pnl(&self) -> f64 {
        self.realized_pnl + self.unrealized_pnl
    }

    fn compute_unrealized(&self) -> f64 {
        self.open_positions()
            .map(|p| p.unrealized_pnl(self.mark_for(p)))
            .sum()
    }

    /// Check the accounting identity. Returns equity on success.
    pub fn check_identity(&self) -> Result<f64, Inconsistency> {
        let position_value = self.position_value();
        let lhs = self.cash + position_value;
        let rhs = self.initial_capital + self.realized_pnl + self.unrealized_pnl;
        let difference = lhs - rhs;
        let tolerance = LEDGER_TOLERANCE * lhs.abs().max(1.0);
        if !lhs.is_finite() || !rhs.is_finite() || difference.abs() > tolerance {
            return Err(Inconsistency {
                initial_capital: self.initial_capital,
                cash: self.cash,
                position_value,
                realized_pnl: self.realized_pnl,
                unrealized_pnl: self.unrealized_pnl,
                difference,
            });
        }
        Ok(lhs)
    }
}

/// Why the ledger refused or failed an update.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The fill was refused; the ledger is unchanged.
    #[error("fill rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The identity broke after an update. Fatal.
    #[error("ledger inconsistency: {0}")]
    Inconsistent(Inconsistency),
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(rejection) => EngineError::RejectedOrder { rejection },
            LedgerError::Inconsistent(details) => EngineError::LedgerInconsistency { details },
        }
    }
}

/// The position ledger for one run.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    state: LedgerState,
    short_allowed: bool,
}

impl PositionLedger {
    pub fn new(initial_capital: f64, short_allowed: bool) -> Self {
        Self {
            state: LedgerState::new(initial_capital),
            short_allowed,
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn cash(&self) -> f64 {
        self.state.cash
    }

    pub fn equity(&self) -> f64 {
        self.state.equity()
    }

    /// Current position, or a flat one if the instrument was never traded.
    pub fn position(&self, instrument_id: &str) -> Position {
        self.state
            .positions
            .get(instrument_id)
            .cloned()
            .unwrap_or_else(|| Position::flat(instrument_id))
    }

    /// Apply a confirmed fill.
    ///
    /// A fill that is malformed, or that would open a short or overdraw cash
    /// while shorting is disabled, is refused and leaves the ledger
    /// untouched.
    pub fn apply(&mut self, fill: &Fill) -> Result<&LedgerState, LedgerError> {
        if !(fill.price.is_finite() && fill.price > 0.0) {
            return Err(Rejection::NonPositivePrice { price: fill.price }.into());
        }
        if !fill.quantity.is_finite() || fill.quantity.abs() <= QUANTITY_EPSILON {
            return Err(Rejection::MalformedFill {
                message: format!("quantity {}", fill.quantity),
            }
            .into());
        }
        if !fill.fees.is_finite() || fill.fees < 0.0 {
            return Err(Rejection::MalformedFill {
                message: format!("fees {}", fill.fees),
            }
            .into());
        }

        let current = self.position(&fill.instrument_id);
        let (next, realized) = transition(&current, fill);
        let cash = self.state.cash + fill.cash_delta();

        if !self.short_allowed {
            if next.quantity < -QUANTITY_EPSILON {
                return Err(Rejection::ShortNotAllowed {
                    position: current.quantity,
                    requested: fill.quantity,
                }
                .into());
            }
            if cash < -QUANTITY_EPSILON {
                return Err(Rejection::InsufficientCash {
                    required: fill.quantity * fill.price + fill.fees,
                    available: self.state.cash,
                }
                .into());
            }
        }

        self.state.cash = cash;
        self.state.realized_pnl += realized - fill.fees;
        self.state.fees_paid += fill.fees;
        // A fill is also a price observation.
        self.state
            .marks
            .insert(fill.instrument_id.clone(), fill.price);
        self.state.positions.insert(fill.instrument_id.clone(), next);

        self.refresh()?;
        Ok(&self.state)
    }

    /// Mark one instrument to `price`. Returns total unrealized PnL.
    ///
    /// Marking the same price twice yields the same result.
    pub fn mark(&mut self, instrument_id: &str, price: f64) -> Result<f64, LedgerError> {
        self.state.marks.insert(instrument_id.to_string(), price);
        self.refresh()?;
        Ok(self.state.unrealized_pnl)
    }

    /// Mark several instruments at once. Returns total unrealized PnL.
    pub fn mark_all<'a>(
        &mut self,
        prices: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<f64, LedgerError> {
        for (id, price) in prices {
            self.state.marks.insert(id.to_string(), price);
        }
        self.refresh()?;
        Ok(self.state.unrealized_pnl)
    }

    /// Recheck the accounting identity. Returns equity.
    pub fn verify(&self) -> Result<f64, LedgerError> {
        self.state.check_identity().map_err(LedgerError::Inconsistent)
    }

    fn refresh(&mut self) -> Result<f64, LedgerError> {
        self.state.unrealized_pnl = self.state.compute_unrealized();
        self.verify()
    }

    pub fn into_state(self) -> LedgerState {
        self.state
    }
}

/// New position and realized PnL (before fees) after applying `fill`.
fn transition(current: &Position, fill: &Fill) -> (Position, f64) {
    let q0 = current.quantity;
    let q = fill.quantity;
    let p = fill.price;
    let id = fill.instrument_id.clone();

    let avg0 = match current.average_cost {
        Some(avg) if !current.is_flat() => avg,
        _ => {
            // Flat -> open
            return (
                Position {
                    instrument_id: id,
                    quantity: q,
                    average_cost: Some(p),
                },
                0.0,
            );
        }
    };

    if q0.signum() == q.signum() {
        // Averaging in on the same side
        let total = q0.abs() + q.abs();
        let avg = (q0.abs() * avg0 + q.abs() * p) / total;
        return (
            Position {
                instrument_id: id,
                quantity: q0 + q,
                average_cost: Some(avg),
            },
            0.0,
        );
    }

    let closed = q.abs().min(q0.abs());
    let realized = (p - avg0) * closed * q0.signum();
    let remaining = q0 + q;

    let position = if remaining.abs() <= QUANTITY_EPSILON {
        Position::flat(id)
    } else if remaining.signum() == q0.signum() {
        Position {
            instrument_id: id,
            quantity: remaining,
            average_cost: Some(avg0),
        }
    } else {
        // Crossed zero: the remainder was opened at the fill price.
        Position {
            instrument_id: id,
            quantity: remaining,
            average_cost: Some(p),
        }
    };
    (position, realized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fill(id: &str, quantity: f64, price: f64, fees: f64) -> Fill {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Fill {
            sequence: 0,
            timestamp: ts,
            decision_timestamp: ts,
            instrument_id: id.into(),
            quantity,
            price,
            fees,
        }
    }

    #[test]
    fn buy_opens_position_and_spends_cash() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        let state = ledger.apply(&fill("ABC", 10.0, 102.0, 0.0)).unwrap();
        assert!((state.cash - 8_980.0).abs() < 1e-10);
        let pos = &state.positions["ABC"];
        assert_eq!(pos.quantity, 10.0);
        assert_eq!(pos.average_cost, Some(102.0));
    }

    #[test]
    fn averaging_in_is_notional_weighted() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 100.0, 0.0)).unwrap();
        ledger.apply(&fill("ABC", 30.0, 120.0, 0.0)).unwrap();
        let pos = ledger.position("ABC");
        assert_eq!(pos.quantity, 40.0);
        // (10*100 + 30*120) / 40 = 115
        assert!((pos.average_cost.unwrap() - 115.0).abs() < 1e-10);
    }

    #[test]
    fn partial_sell_realizes_and_keeps_average() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 100.0, 0.0)).unwrap();
        ledger.apply(&fill("ABC", -4.0, 110.0, 0.0)).unwrap();
        let state = ledger.state();
        assert!((state.realized_pnl - 40.0).abs() < 1e-10);
        assert_eq!(state.positions["ABC"].quantity, 6.0);
        assert_eq!(state.positions["ABC"].average_cost, Some(100.0));
    }

    #[test]
    fn closing_fill_resets_average_cost() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 102.0, 0.0)).unwrap();
        ledger.apply(&fill("ABC", -10.0, 105.0, 0.0)).unwrap();
        let pos = ledger.position("ABC");
        assert_eq!(pos.quantity, 0.0);
        assert_eq!(pos.average_cost, None);
        assert!((ledger.state().realized_pnl - 30.0).abs() < 1e-10);
        assert!((ledger.cash() - 10_030.0).abs() < 1e-10);
    }

    #[test]
    fn flip_long_to_short_opens_remainder_at_fill_price() {
        let mut ledger = PositionLedger::new(10_000.0, true);
        ledger.apply(&fill("ABC", 10.0, 100.0, 0.0)).unwrap();
        ledger.apply(&fill("ABC", -15.0, 90.0, 0.0)).unwrap();
        let pos = ledger.position("ABC");
        assert_eq!(pos.quantity, -5.0);
        assert_eq!(pos.average_cost, Some(90.0));
        // closed 10 at a loss of 10 each
        assert!((ledger.state().realized_pnl + 100.0).abs() < 1e-10);
    }

    #[test]
    fn covering_short_realizes_gain() {
        let mut ledger = PositionLedger::new(1_000.0, true);
        ledger.apply(&fill("ABC", -5.0, 100.0, 0.0)).unwrap();
        ledger.apply(&fill("ABC", 5.0, 80.0, 0.0)).unwrap();
        assert!((ledger.state().realized_pnl - 100.0).abs() < 1e-10);
        assert!((ledger.cash() - 1_100.0).abs() < 1e-10);
    }

    #[test]
    fn fees_reduce_cash_and_realized() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 100.0, 2.5)).unwrap();
        let state = ledger.state();
        assert!((state.cash - 8_997.5).abs() < 1e-10);
        assert!((state.realized_pnl + 2.5).abs() < 1e-10);
        assert!((state.fees_paid - 2.5).abs() < 1e-10);
        assert!(ledger.verify().is_ok());
    }

    #[test]
    fn overdraw_is_rejected_and_ledger_unchanged() {
        let mut ledger = PositionLedger::new(1_000.0, false);
        let before = ledger.state().clone();
        let err = ledger.apply(&fill("ABC", 20.0, 100.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Rejected(Rejection::InsufficientCash { .. })
        ));
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn opening_short_rejected_when_disallowed() {
        let mut ledger = PositionLedger::new(1_000.0, false);
        let before = ledger.state().clone();
        let err = ledger.apply(&fill("ABC", -1.0, 100.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Rejected(Rejection::ShortNotAllowed { .. })
        ));
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn malformed_fills_rejected() {
        let mut ledger = PositionLedger::new(1_000.0, true);
        assert!(ledger.apply(&fill("ABC", 1.0, 0.0, 0.0)).is_err());
        assert!(ledger.apply(&fill("ABC", 0.0, 10.0, 0.0)).is_err());
        assert!(ledger.apply(&fill("ABC", 1.0, 10.0, -1.0)).is_err());
        assert!(ledger.apply(&fill("ABC", f64::NAN, 10.0, 0.0)).is_err());
        assert_eq!(ledger.state(), &LedgerState::new(1_000.0));
    }

    #[test]
    fn mark_updates_unrealized() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 102.0, 0.0)).unwrap();
        let unrealized = ledger.mark("ABC", 105.0).unwrap();
        assert!((unrealized - 30.0).abs() < 1e-10);
        assert!((ledger.equity() - 10_030.0).abs() < 1e-10);
    }

    #[test]
    fn mark_is_idempotent() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 102.0, 1.0)).unwrap();
        let first = ledger.mark("ABC", 101.0).unwrap();
        let snapshot = ledger.state().clone();
        let second = ledger.mark("ABC", 101.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.state(), &snapshot);
    }

    #[test]
    fn mark_all_marks_every_instrument() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 100.0, 0.0)).unwrap();
        ledger.apply(&fill("XYZ", 5.0, 50.0, 0.0)).unwrap();
        let unrealized = ledger.mark_all([("ABC", 110.0), ("XYZ", 40.0)]).unwrap();
        // 10*10 - 5*10 = 50
        assert!((unrealized - 50.0).abs() < 1e-10);
    }

    #[test]
    fn non_finite_mark_on_open_position_is_inconsistent() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        ledger.apply(&fill("ABC", 10.0, 100.0, 0.0)).unwrap();
        let err = ledger.mark("ABC", f64::NAN).unwrap_err();
        assert!(matches!(err, LedgerError::Inconsistent(_)));
        assert!(EngineError::from(err).is_fatal());
    }

    #[test]
    fn non_finite_mark_on_flat_instrument_is_harmless() {
        let mut ledger = PositionLedger::new(10_000.0, false);
        assert!(ledger.mark("ABC", f64::NAN).is_ok());
    }

    #[test]
    fn rejection_maps_to_recoverable_engine_error() {
        let err: EngineError = LedgerError::Rejected(Rejection::NonPositivePrice { price: 0.0 }).into();
        assert!(matches!(err, EngineError::RejectedOrder { .. }));
        assert!(!err.is_fatal());
    }
}
