//! Scripted decisions keyed by event index.
//!
//! Emits a fixed decision when the history reaches a given length. Useful
//! for replaying a known sequence of trades and for scenario tests.

use crate::domain::{Decision, DecisionKind, Position};
use crate::signals::{HistoryView, SignalEngine};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ScheduledDecisions {
    /// Index of the processed event (0-based) → (instrument, what to do).
    schedule: BTreeMap<usize, (String, DecisionKind)>,
}

impl ScheduledDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `kind` for `instrument_id` after the event at `index` is observed.
    pub fn at(mut self, index: usize, instrument_id: impl Into<String>, kind: DecisionKind) -> Self {
        self.schedule.insert(index, (instrument_id.into(), kind));
        self
    }

    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }
}

impl SignalEngine for ScheduledDecisions {
    fn decide(&self, history: HistoryView<'_>, _current_position: &Position) -> Option<Decision> {
        let now = history.now()?;
        let (instrument_id, kind) = self.schedule.get(&(history.len() - 1))?;
        Some(Decision {
            timestamp: now.timestamp,
            instrument_id: instrument_id.clone(),
            kind: kind.clone(),
        })
    }

    fn name(&self) -> &str {
        "scheduled"
    }
}
