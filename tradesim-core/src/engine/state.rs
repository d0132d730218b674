//! Engine configuration, run status, stop flag and the run report.

use crate::domain::{Decision, EquityPoint, Fill, MarketEvent, OutputHash, Universe};
use crate::engine::execution::ExecutionConfig;
use crate::engine::ledger::LedgerState;
use crate::engine::trade_log::{TradeLogEntry, TradeRecord};
use crate::error::{EngineError, Rejection};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Fee model, fill policy, short policy and jitter.
    pub execution: ExecutionConfig,
    /// Instruments the run may trade. Empty accepts every feed instrument.
    pub universe: Universe,
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            execution: ExecutionConfig::frictionless(),
            universe: Universe::open(),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_universe(mut self, universe: Universe) -> Self {
        self.universe = universe;
        self
    }
}

/// Runner lifecycle: `Init → Running → {Completed, Aborted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    Running,
    Completed,
    Aborted,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted {
        error: EngineError,
        /// Feed index at which the run stopped.
        sequence: usize,
        /// The event being processed, when there was one.
        failing_event: Option<MarketEvent>,
    },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            RunStatus::Completed => None,
            RunStatus::Aborted { error, .. } => Some(error),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Aborted { .. } => "aborted",
        }
    }
}

/// A decision waiting for the next event of its instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDecision {
    /// Feed index of the event that produced the decision.
    pub queued_at: usize,
    pub decision: Decision,
}

/// Cooperative cancellation flag shared with the caller.
///
/// The runner checks it between events.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a run produced, complete or partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub strategy: String,
    pub status: RunStatus,
    pub final_state: LedgerState,
    pub trade_log: Vec<TradeLogEntry>,
    pub equity_curve: Vec<EquityPoint>,
    /// Decisions that never met a later event for their instrument.
    pub pending: Vec<PendingDecision>,
    /// Events that entered history.
    pub events_processed: usize,
    /// Events for instruments outside the universe.
    pub events_skipped: usize,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn fills(&self) -> impl Iterator<Item = &Fill> {
        self.trade_log.iter().filter_map(TradeLogEntry::as_fill)
    }

    pub fn rejections(&self) -> impl Iterator<Item = &Rejection> {
        self.trade_log.iter().filter_map(TradeLogEntry::as_rejection)
    }

    pub fn no_op_count(&self) -> usize {
        self.trade_log
            .iter()
            .filter(|e| matches!(e, TradeLogEntry::NoOp { .. }))
            .count()
    }

    pub fn superseded_count(&self) -> usize {
        self.trade_log
            .iter()
            .filter(|e| matches!(e, TradeLogEntry::Superseded { .. }))
            .count()
    }

    /// Equity at the last processed event, or initial capital if none.
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.final_state.initial_capital, |p| p.total_equity)
    }

    pub fn total_return(&self) -> f64 {
        let initial = self.final_state.initial_capital;
        if initial.abs() > 0.0 {
            self.final_equity() / initial - 1.0
        } else {
            0.0
        }
    }

    /// Flat trade log rows for export.
    pub fn trade_records(&self) -> Vec<TradeRecord> {
        self.trade_log.iter().map(TradeRecord::from).collect()
    }

    /// BLAKE3 over the serialized trade log and equity curve.
    ///
    /// Identical feeds and configs give identical hashes.
    pub fn output_hash(&self) -> Result<OutputHash, serde_json::Error> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, &self.trade_log)?;
        serde_json::to_writer(&mut hasher, &self.equity_curve)?;
        Ok(OutputHash(hasher.finalize().to_hex().to_string()))
    }
}
