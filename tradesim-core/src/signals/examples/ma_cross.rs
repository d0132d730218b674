//! Moving Average Crossover
//!
//! Long-only trend following on a single instrument's price series:
//! - Target `+quantity` while the fast SMA is above the slow SMA
//! - Target flat otherwise

use crate::domain::{Decision, Position, QUANTITY_EPSILON};
use crate::signals::{HistoryView, SignalEngine, SignalError};

/// Moving Average Crossover signal engine
///
/// # Parameters
/// - `fast_period`: Short MA period (e.g., 10)
/// - `slow_period`: Long MA period (e.g., 50)
/// - `quantity`: Position size while the trend is up
#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    fast_period: usize,
    slow_period: usize,
    quantity: f64,
    name: String,
}

impl MovingAverageCross {
    pub fn new(fast_period: usize, slow_period: usize, quantity: f64) -> Result<Self, SignalError> {
        if fast_period == 0 {
            return Err(SignalError::InvalidParameter {
                name: "fast",
                reason: "must be > 0".into(),
            });
        }
        if slow_period <= fast_period {
            return Err(SignalError::InvalidParameter {
                name: "slow",
                reason: format!("must be > fast ({fast_period}), got {slow_period}"),
            });
        }
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(SignalError::InvalidParameter {
                name: "quantity",
                reason: format!("must be a positive number, got {quantity}"),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            quantity,
            name: format!("ma_cross_{fast_period}_{slow_period}"),
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast_period
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period
    }

    /// Calculate simple moving average over the last `period` prices.
    fn sma(prices: &[f64], period: usize) -> Option<f64> {
        if prices.len() < period {
            return None;
        }
        let recent = &prices[prices.len() - period..];
        Some(recent.iter().sum::<f64>() / period as f64)
    }
}

impl SignalEngine for MovingAverageCross {
    fn decide(&self, history: HistoryView<'_>, current_position: &Position) -> Option<Decision> {
        let now = history.now()?;
        let prices = history.recent_prices(&now.instrument_id, self.slow_period);

        // Not enough data yet
        let fast = Self::sma(&prices, self.fast_period)?;
        let slow = Self::sma(&prices, self.slow_period)?;

        let target = if fast > slow { self.quantity } else { 0.0 };
        if (target - current_position.quantity).abs() <= QUANTITY_EPSILON {
            return None;
        }
        Some(Decision::target_quantity(
            now.timestamp,
            now.instrument_id.clone(),
            target,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
