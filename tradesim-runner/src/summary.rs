//! End-of-run summary: fund details and log counts.

use serde::{Deserialize, Serialize};
use std::fmt;

use tradesim_core::domain::{EquityPoint, Position};
use tradesim_core::engine::RunReport;

/// Headline numbers of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: String,
    pub status: String,
    pub error: Option<String>,
    pub events_processed: usize,
    pub events_skipped: usize,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub cash: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub fees_paid: f64,
    pub total_return: f64,
    /// Largest peak-to-trough fall of the equity curve, as a negative fraction.
    pub max_drawdown: f64,
    pub fills: usize,
    pub rejections: usize,
    pub no_ops: usize,
    pub superseded: usize,
    pub pending: usize,
    pub open_positions: Vec<Position>,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        let state = &report.final_state;
        Self {
            strategy: report.strategy.clone(),
            status: report.status.label().to_string(),
            error: report.status.error().map(ToString::to_string),
            events_processed: report.events_processed,
            events_skipped: report.events_skipped,
            initial_capital: state.initial_capital,
            final_equity: report.final_equity(),
            cash: state.cash,
            realized_pnl: state.realized_pnl,
            unrealized_pnl: state.unrealized_pnl,
            fees_paid: state.fees_paid,
            total_return: report.total_return(),
            max_drawdown: max_drawdown(&report.equity_curve),
            fills: report.fills().count(),
            rejections: report.rejections().count(),
            no_ops: report.no_op_count(),
            superseded: report.superseded_count(),
            pending: report.pending.len(),
            open_positions: state.open_positions().cloned().collect(),
        }
    }
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below a previous peak.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        let eq = point.total_equity;
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(44);
        writeln!(f, "{rule}")?;
        writeln!(f, " Fund details: {}", self.strategy)?;
        writeln!(f, "{rule}")?;
        writeln!(f, " Status:          {}", self.status)?;
        if let Some(error) = &self.error {
            writeln!(f, " Error:           {error}")?;
        }
        writeln!(
            f,
            " Events:          {} ({} skipped)",
            self.events_processed, self.events_skipped
        )?;
        writeln!(f, " Initial capital: {:>14.2}", self.initial_capital)?;
        writeln!(f, " Final equity:    {:>14.2}", self.final_equity)?;
        writeln!(f, " Cash:            {:>14.2}", self.cash)?;
        writeln!(f, " Realized PnL:    {:>14.2}", self.realized_pnl)?;
        writeln!(f, " Unrealized PnL:  {:>14.2}", self.unrealized_pnl)?;
        writeln!(f, " Fees paid:       {:>14.2}", self.fees_paid)?;
        writeln!(f, " Total return:    {:>13.2}%", self.total_return * 100.0)?;
        writeln!(f, " Max drawdown:    {:>13.2}%", self.max_drawdown * 100.0)?;
        writeln!(
            f,
            " Fills: {}  Rejected: {}  No-ops: {}  Superseded: {}  Pending: {}",
            self.fills, self.rejections, self.no_ops, self.superseded, self.pending
        )?;
        if !self.open_positions.is_empty() {
            writeln!(f, "{}", "-".repeat(44))?;
            writeln!(f, " {:<10} {:>14} {:>16}", "Instrument", "Quantity", "Avg cost")?;
            for p in &self.open_positions {
                writeln!(
                    f,
                    " {:<10} {:>14.4} {:>16.4}",
                    p.instrument_id,
                    p.quantity,
                    p.average_cost.unwrap_or(0.0)
                )?;
            }
        }
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                timestamp: ts,
                sequence: i,
                total_equity: v,
            })
            .collect()
    }

    #[test]
    fn max_drawdown_known() {
        let dd = max_drawdown(&curve(&[100.0, 120.0, 90.0, 130.0, 117.0]));
        assert!((dd - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_increase() {
        assert_eq!(max_drawdown(&curve(&[100.0, 101.0, 105.0])), 0.0);
    }

    #[test]
    fn max_drawdown_empty() {
        assert_eq!(max_drawdown(&[]), 0.0);
    }
}
