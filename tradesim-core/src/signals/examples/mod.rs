//! Bundled signal engines.

pub mod ma_cross;
pub mod rebalance;
pub mod scheduled;

pub use ma_cross::MovingAverageCross;
pub use rebalance::PeriodicRebalance;
pub use scheduled::ScheduledDecisions;
