use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Total equity after processing one market event.
///
/// Points are ordered by `(timestamp, sequence)`; `sequence` breaks ties
/// between events that share a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub sequence: usize,
    pub total_equity: f64,
}
