//! Domain types for the trading simulator.

pub mod decision;
pub mod equity;
pub mod event;
pub mod fill;
pub mod ids;
pub mod instrument;
pub mod position;

pub use decision::{Decision, DecisionKind, OrderSide, OrderType};
pub use equity::EquityPoint;
pub use event::MarketEvent;
pub use fill::Fill;
pub use ids::{ConfigHash, DatasetHash, OutputHash, RunId};
pub use instrument::{Instrument, Universe};
pub use position::Position;

/// Instrument identifier type alias.
pub type InstrumentId = String;

/// Quantities with an absolute value at or below this are treated as zero.
pub const QUANTITY_EPSILON: f64 = 1e-9;
