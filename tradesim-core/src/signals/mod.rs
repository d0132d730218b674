//! Signal engines: strategy logic that turns observed history into decisions.
//!
//! A signal engine only ever sees a prefix of the feed. The runner builds the
//! `HistoryView` from the events it has already consumed, so there is no way
//! to reach an event that has not been read yet.

pub mod examples;

use crate::domain::{Decision, MarketEvent, Position};
use thiserror::Error;

/// Read-only view of every event processed so far, oldest first.
///
/// The last event is "now": the event currently being processed.
#[derive(Debug, Clone, Copy)]
pub struct HistoryView<'a> {
    events: &'a [MarketEvent],
}

impl<'a> HistoryView<'a> {
    pub fn new(events: &'a [MarketEvent]) -> Self {
        Self { events }
    }

    /// The event currently being processed.
    pub fn now(&self) -> Option<&'a MarketEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &'a [MarketEvent] {
        self.events
    }

    /// Events for one instrument, oldest first.
    pub fn for_instrument<'b>(
        &self,
        instrument_id: &'b str,
    ) -> impl DoubleEndedIterator<Item = &'a MarketEvent> + 'b
    where
        'a: 'b,
    {
        self.events
            .iter()
            .filter(move |e| e.instrument_id == instrument_id)
    }

    /// The most recent `n` prices for an instrument, oldest first.
    ///
    /// Returns fewer than `n` values when not enough history exists.
    pub fn recent_prices(&self, instrument_id: &str, n: usize) -> Vec<f64> {
        let mut prices: Vec<f64> = self
            .for_instrument(instrument_id)
            .rev()
            .take(n)
            .map(|e| e.price)
            .collect();
        prices.reverse();
        prices
    }

    /// The latest event for an instrument before "now".
    pub fn previous(&self, instrument_id: &str) -> Option<&'a MarketEvent> {
        let (_, earlier) = self.events.split_last()?;
        earlier
            .iter()
            .rev()
            .find(|e| e.instrument_id == instrument_id)
    }
}

/// Strategy logic.
///
/// # Invariants
/// - `decide()` MUST be deterministic for the same history and position
/// - `decide()` sees only the prefix handed to it
pub trait SignalEngine: Send + Sync {
    /// Decide what to do after observing `history`.
    ///
    /// `current_position` is the position in the instrument of the current
    /// event (flat if never traded).
    fn decide(&self, history: HistoryView<'_>, current_position: &Position) -> Option<Decision>;

    /// Strategy name for manifests and logs.
    fn name(&self) -> &str;
}

/// Invalid strategy parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn history() -> Vec<MarketEvent> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        vec![
            MarketEvent::new(t0, "ABC", 100.0, 1.0),
            MarketEvent::new(t0, "XYZ", 50.0, 1.0),
            MarketEvent::new(t0 + Duration::days(1), "ABC", 101.0, 1.0),
            MarketEvent::new(t0 + Duration::days(1), "XYZ", 51.0, 1.0),
            MarketEvent::new(t0 + Duration::days(2), "ABC", 102.0, 1.0),
        ]
    }

    struct NullEngine;

    impl SignalEngine for NullEngine {
        fn decide(&self, _history: HistoryView<'_>, _position: &Position) -> Option<Decision> {
            None
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn now_is_last_event() {
        let events = history();
        let view = HistoryView::new(&events);
        assert_eq!(view.now().unwrap().price, 102.0);
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn recent_prices_per_instrument() {
        let events = history();
        let view = HistoryView::new(&events);
        assert_eq!(view.recent_prices("ABC", 2), vec![101.0, 102.0]);
        assert_eq!(view.recent_prices("XYZ", 10), vec![50.0, 51.0]);
        assert!(view.recent_prices("QQQ", 3).is_empty());
    }

    #[test]
    fn previous_excludes_now() {
        let events = history();
        let view = HistoryView::new(&events);
        assert_eq!(view.previous("ABC").unwrap().price, 101.0);
        assert_eq!(view.previous("XYZ").unwrap().price, 51.0);
        assert!(HistoryView::new(&events[..1]).previous("ABC").is_none());
    }

    #[test]
    fn signal_engine_is_object_safe() {
        let engine: Box<dyn SignalEngine> = Box::new(NullEngine);
        let events = history();
        assert!(engine
            .decide(HistoryView::new(&events), &Position::flat("ABC"))
            .is_none());
        assert_eq!(engine.name(), "null");
    }
}
