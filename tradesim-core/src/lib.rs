//! tradesim core: event-driven backtesting and execution simulation.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (market events, decisions, fills, positions, instruments)
//! - The `MarketDataFeed` trait and an in-memory feed
//! - The `SignalEngine` trait and bundled strategies
//! - Execution simulator with fill policies, fee models and seeded jitter
//! - Position ledger with a verified accounting identity
//! - The per-event runner state machine
//! - Deterministic RNG and run fingerprinting

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod rng;
pub mod signals;

pub use error::{EngineError, Rejection};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared with sweep worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::MarketEvent>();
        require_sync::<domain::MarketEvent>();
        require_send::<domain::Decision>();
        require_sync::<domain::Decision>();
        require_send::<domain::Fill>();
        require_sync::<domain::Fill>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Universe>();
        require_sync::<domain::Universe>();

        // Engine types
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::RunReport>();
        require_sync::<engine::RunReport>();
        require_send::<engine::StopFlag>();
        require_sync::<engine::StopFlag>();
        require_send::<engine::BacktestRunner>();
        require_send::<EngineError>();
        require_sync::<EngineError>();

        // Feeds and strategies
        require_send::<data::InMemoryFeed>();
        require_sync::<data::InMemoryFeed>();
        require_send::<signals::examples::MovingAverageCross>();
        require_sync::<signals::examples::MovingAverageCross>();
        require_send::<signals::examples::PeriodicRebalance>();
        require_sync::<signals::examples::PeriodicRebalance>();

        // RNG and fingerprint
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
        require_send::<fingerprint::RunFingerprint>();
        require_sync::<fingerprint::RunFingerprint>();
    }

    /// The strategy interface receives the history prefix and one position,
    /// never the ledger.
    #[test]
    fn signal_engine_sees_only_prefix_and_position() {
        fn _check_trait_object_builds(
            engine: &dyn signals::SignalEngine,
            history: &[domain::MarketEvent],
            position: &domain::Position,
        ) -> Option<domain::Decision> {
            engine.decide(signals::HistoryView::new(history), position)
        }
    }
}
