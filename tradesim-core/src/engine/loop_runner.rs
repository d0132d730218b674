//! Event loop: the backtest runner state machine.
//!
//! Events are pulled from the feed one at a time. For each event:
//!
//! 1. Ordering check (timestamps must not decrease)
//! 2. Append to history
//! 3. Execute the pending decision for this event's instrument
//! 4. Ask the signal engine for a decision on the prefix seen so far
//! 5. Validate and queue that decision
//! 6. Mark the ledger to the event's price
//! 7. Verify the ledger identity
//! 8. Append an equity point
//!
//! A decision therefore never fills at the event that produced it.

use crate::data::MarketDataFeed;
use crate::domain::{Decision, EquityPoint, MarketEvent, Universe};
use crate::engine::execution::ExecutionSimulator;
use crate::engine::ledger::{LedgerError, PositionLedger};
use crate::engine::state::{
    EngineConfig, PendingDecision, RunPhase, RunReport, RunStatus, StopFlag,
};
use crate::engine::trade_log::{NoOpReason, TradeLogEntry};
use crate::error::{EngineError, Rejection};
use crate::signals::{HistoryView, SignalEngine};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Drives one backtest at a time.
///
/// Each call to `run` starts from `Init` with a fresh ledger.
#[derive(Debug)]
pub struct BacktestRunner {
    config: EngineConfig,
    phase: RunPhase,
    stop: StopFlag,
}

impl BacktestRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            phase: RunPhase::Init,
            stop: StopFlag::new(),
        }
    }

    /// Use a caller-owned stop flag for cooperative cancellation.
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `strategy` over `feed`.
    ///
    /// Never panics on bad data: fatal problems end the run as `Aborted`
    /// with everything produced up to that point.
    pub fn run(&mut self, feed: &dyn MarketDataFeed, strategy: &dyn SignalEngine) -> RunReport {
        self.phase = RunPhase::Init;
        let mut ctx = RunContext::new(&self.config);

        info!(
            strategy = strategy.name(),
            feed = feed.name(),
            initial_capital = self.config.initial_capital,
            "backtest started"
        );
        self.phase = RunPhase::Running;

        let mut status = RunStatus::Completed;
        let mut last_timestamp: Option<DateTime<Utc>> = None;

        for (sequence, item) in feed.events().enumerate() {
            if self.stop.is_stopped() {
                status = RunStatus::Aborted {
                    error: EngineError::Cancelled,
                    sequence,
                    failing_event: None,
                };
                break;
            }

            let event = match item {
                Ok(event) => event,
                Err(err) => {
                    status = RunStatus::Aborted {
                        error: EngineError::Feed {
                            message: err.to_string(),
                        },
                        sequence,
                        failing_event: None,
                    };
                    break;
                }
            };

            if let Some(previous) = last_timestamp {
                if event.timestamp < previous {
                    status = RunStatus::Aborted {
                        error: EngineError::DataOrdering {
                            sequence,
                            timestamp: event.timestamp,
                            previous,
                        },
                        sequence,
                        failing_event: Some(event),
                    };
                    break;
                }
            }
            last_timestamp = Some(event.timestamp);

            if let Err(error) = ctx.process(&event, sequence, strategy) {
                status = RunStatus::Aborted {
                    error,
                    sequence,
                    failing_event: Some(event),
                };
                break;
            }
        }

        match &status {
            RunStatus::Completed => {
                self.phase = RunPhase::Completed;
                info!(
                    strategy = strategy.name(),
                    events = ctx.events_processed,
                    skipped = ctx.events_skipped,
                    pending = ctx.pending.len(),
                    final_equity = ctx.ledger.equity(),
                    "backtest completed"
                );
            }
            RunStatus::Aborted {
                error, sequence, ..
            } => {
                self.phase = RunPhase::Aborted;
                error!(strategy = strategy.name(), sequence, %error, "backtest aborted");
            }
        }

        ctx.into_report(strategy.name(), status)
    }
}

/// Run a backtest with a fresh runner.
pub fn run_backtest(
    config: &EngineConfig,
    feed: &dyn MarketDataFeed,
    strategy: &dyn SignalEngine,
) -> RunReport {
    BacktestRunner::new(config.clone()).run(feed, strategy)
}

/// Mutable state for one run.
struct RunContext {
    universe: Universe,
    ledger: PositionLedger,
    simulator: ExecutionSimulator,
    history: Vec<MarketEvent>,
    pending: BTreeMap<String, PendingDecision>,
    trade_log: Vec<TradeLogEntry>,
    equity_curve: Vec<EquityPoint>,
    events_processed: usize,
    events_skipped: usize,
}

impl RunContext {
    fn new(config: &EngineConfig) -> Self {
        Self {
            universe: config.universe.clone(),
            ledger: PositionLedger::new(config.initial_capital, config.execution.short_allowed),
            simulator: ExecutionSimulator::new(config.execution.clone(), config.universe.clone()),
            history: Vec::new(),
            pending: BTreeMap::new(),
            trade_log: Vec::new(),
            equity_curve: Vec::new(),
            events_processed: 0,
            events_skipped: 0,
        }
    }

    /// Steps 2–8 for one event. Returns only fatal errors.
    fn process(
        &mut self,
        event: &MarketEvent,
        sequence: usize,
        strategy: &dyn SignalEngine,
    ) -> Result<(), EngineError> {
        if !self.universe.contains(&event.instrument_id) {
            self.events_skipped += 1;
            debug!(
                sequence,
                instrument = %event.instrument_id,
                "event outside universe skipped"
            );
            return Ok(());
        }

        self.history.push(event.clone());
        self.events_processed += 1;

        if let Some(pending) = self.pending.remove(&event.instrument_id) {
            self.execute(pending, event, sequence)?;
        }

        let position = self.ledger.position(&event.instrument_id);
        if let Some(decision) = strategy.decide(HistoryView::new(&self.history), &position) {
            self.queue(decision, event, sequence);
        }

        self.ledger.mark(&event.instrument_id, event.price)?;
        let total_equity = self.ledger.verify()?;
        self.equity_curve.push(EquityPoint {
            timestamp: event.timestamp,
            sequence,
            total_equity,
        });
        Ok(())
    }

    fn execute(
        &mut self,
        pending: PendingDecision,
        event: &MarketEvent,
        sequence: usize,
    ) -> Result<(), EngineError> {
        let decision = pending.decision;
        let position = self.ledger.position(&decision.instrument_id);
        let outcome = self.simulator.simulate(
            &decision,
            event,
            sequence,
            &position,
            self.ledger.cash(),
        );

        match outcome {
            Ok(Some(fill)) => match self.ledger.apply(&fill).map(|_| ()) {
                Ok(()) => {
                    debug!(
                        sequence,
                        instrument = %fill.instrument_id,
                        quantity = fill.quantity,
                        price = fill.price,
                        fees = fill.fees,
                        "fill"
                    );
                    self.trade_log.push(TradeLogEntry::Fill { fill });
                }
                Err(LedgerError::Rejected(rejection)) => {
                    self.reject(decision, event, sequence, rejection);
                }
                Err(LedgerError::Inconsistent(details)) => {
                    return Err(EngineError::LedgerInconsistency { details });
                }
            },
            Ok(None) => {
                debug!(sequence, instrument = %decision.instrument_id, "nothing to trade");
                self.no_op(decision, event, sequence, NoOpReason::ZeroQuantity);
            }
            Err(rejection) => self.reject(decision, event, sequence, rejection),
        }
        Ok(())
    }

    fn queue(&mut self, decision: Decision, event: &MarketEvent, sequence: usize) {
        if !decision.is_well_formed() || decision.timestamp > event.timestamp {
            warn!(sequence, instrument = %decision.instrument_id, "invalid decision ignored");
            self.no_op(decision, event, sequence, NoOpReason::InvalidDecision);
            return;
        }
        if !self.universe.contains(&decision.instrument_id) {
            let error = EngineError::UnknownInstrument {
                instrument_id: decision.instrument_id.clone(),
            };
            warn!(sequence, %error, "decision ignored");
            self.no_op(decision, event, sequence, NoOpReason::UnknownInstrument);
            return;
        }
        if decision.is_empty_order() {
            debug!(sequence, instrument = %decision.instrument_id, "zero-quantity order ignored");
            self.no_op(decision, event, sequence, NoOpReason::ZeroQuantity);
            return;
        }

        let replaced = self.pending.insert(
            decision.instrument_id.clone(),
            PendingDecision {
                queued_at: sequence,
                decision,
            },
        );
        if let Some(old) = replaced {
            debug!(
                sequence,
                instrument = %old.decision.instrument_id,
                queued_at = old.queued_at,
                "pending decision superseded"
            );
            self.trade_log.push(TradeLogEntry::Superseded {
                sequence,
                timestamp: event.timestamp,
                decision: old.decision,
            });
        }
    }

    fn reject(
        &mut self,
        decision: Decision,
        event: &MarketEvent,
        sequence: usize,
        rejection: Rejection,
    ) {
        let error = EngineError::RejectedOrder {
            rejection: rejection.clone(),
        };
        warn!(sequence, instrument = %decision.instrument_id, %error, "order rejected");
        self.trade_log.push(TradeLogEntry::Rejected {
            sequence,
            timestamp: event.timestamp,
            decision,
            rejection,
        });
    }

    fn no_op(
        &mut self,
        decision: Decision,
        event: &MarketEvent,
        sequence: usize,
        reason: NoOpReason,
    ) {
        self.trade_log.push(TradeLogEntry::NoOp {
            sequence,
            timestamp: event.timestamp,
            decision,
            reason,
        });
    }

    fn into_report(self, strategy: &str, status: RunStatus) -> RunReport {
        RunReport {
            strategy: strategy.to_string(),
            status,
            final_state: self.ledger.into_state(),
            trade_log: self.trade_log,
            equity_curve: self.equity_curve,
            pending: self.pending.into_values().collect(),
            events_processed: self.events_processed,
            events_skipped: self.events_skipped,
        }
    }
}
