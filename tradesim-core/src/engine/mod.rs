//! Backtesting engine: execution simulation, ledger and the event loop.
//!
//! The pieces are separately testable:
//! - `execution`: decision + market event → fill or rejection
//! - `ledger`: fills and marks → positions, cash, PnL, with identity checks
//! - `loop_runner`: the per-event state machine that wires them together

pub mod execution;
pub mod ledger;
pub mod loop_runner;
pub mod state;
pub mod trade_log;

pub use execution::{
    ExecutionConfig, ExecutionSimulator, FeeModel, FillPolicy, JitterSource, PriceJitter,
};
pub use ledger::{LedgerError, LedgerState, PositionLedger, LEDGER_TOLERANCE};
pub use loop_runner::{run_backtest, BacktestRunner};
pub use state::{
    EngineConfig, PendingDecision, RunPhase, RunReport, RunStatus, StopFlag,
};
pub use trade_log::{NoOpReason, TradeLogEntry, TradeRecord};
