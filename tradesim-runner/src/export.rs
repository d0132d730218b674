//! Reporting and export: JSON run reports and CSV trade log / equity curve.
//!
//! All persisted reports include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use tradesim_core::domain::EquityPoint;
use tradesim_core::engine::TradeRecord;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepEntry;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade log as CSV.
///
/// Columns: kind, sequence, timestamp, instrument_id, quantity, price, fees,
/// reason. Empty cells for fields that do not apply to the entry kind.
pub fn export_trades_csv(records: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    if records.is_empty() {
        wtr.write_record([
            "kind",
            "sequence",
            "timestamp",
            "instrument_id",
            "quantity",
            "price",
            "fees",
            "reason",
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush trades CSV")?;
    String::from_utf8(bytes).context("trades CSV is not UTF-8")
}

/// Equity curve as CSV. Columns: sequence, timestamp, total_equity.
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["sequence", "timestamp", "total_equity"])?;
    for point in curve {
        wtr.write_record([
            point.sequence.to_string(),
            point.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            format!("{:.6}", point.total_equity),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush equity CSV")?;
    String::from_utf8(bytes).context("equity CSV is not UTF-8")
}

/// One row per sweep entry, in the order given.
pub fn export_sweep_csv(entries: &[SweepEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "strategy",
        "fee_model",
        "status",
        "final_equity",
        "total_return",
        "max_drawdown",
        "fills",
        "rejections",
        "run_hash",
    ])?;
    for entry in entries {
        let s = &entry.result.summary;
        wtr.write_record([
            entry.label.clone(),
            entry.fee_model.label(),
            s.status.clone(),
            format!("{:.2}", s.final_equity),
            format!("{:.6}", s.total_return),
            format!("{:.6}", s.max_drawdown),
            s.fills.to_string(),
            s.rejections.to_string(),
            entry.result.fingerprint.run_hash(),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush sweep CSV")?;
    String::from_utf8(bytes).context("sweep CSV is not UTF-8")
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Write `report.json`, `trades.csv` and `equity.csv` into
/// `<output_dir>/<fingerprint label>/`. Returns that directory.
///
/// The directory name depends only on config, dataset and seed, so
/// rerunning the same backtest overwrites the same artifacts.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(result.fingerprint.label());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    write(&run_dir.join("report.json"), &json)?;

    let trades_csv = export_trades_csv(&result.report.trade_records())?;
    write(&run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(&result.report.equity_curve)?;
    write(&run_dir.join("equity.csv"), &equity_csv)?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's report.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
