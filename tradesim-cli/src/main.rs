//! tradesim CLI: run backtests and parameter sweeps.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config and a CSV feed
//! - `sweep`: run a moving-average parameter grid in parallel and rank it

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tradesim_core::engine::FeeModel;
use tradesim_runner::export::export_sweep_csv;
use tradesim_runner::{
    rank_by_return, run_files, save_artifacts, BacktestConfig, CsvFeed, ParamGrid, ParamSweep,
};

#[derive(Parser)]
#[command(
    name = "tradesim",
    about = "tradesim CLI: event-driven backtesting and execution simulation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file and a CSV feed.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV with columns timestamp,instrument_id,price,volume.
        #[arg(long)]
        data: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Sweep moving-average periods and proportional fee rates.
    Sweep {
        /// Base TOML config (capital, instruments, execution). It must still
        /// hold a valid `[strategy]` table; each grid point replaces it.
        #[arg(long)]
        config: PathBuf,

        /// CSV with columns timestamp,instrument_id,price,volume.
        #[arg(long)]
        data: PathBuf,

        /// Fast periods, comma-separated.
        #[arg(long, value_delimiter = ',', default_value = "10,20,30")]
        fast: Vec<usize>,

        /// Slow periods, comma-separated.
        #[arg(long, value_delimiter = ',', default_value = "50,100,200")]
        slow: Vec<usize>,

        /// Proportional fee rates, comma-separated; 0 means frictionless.
        #[arg(long, value_delimiter = ',', default_value = "0,0.001")]
        fee_rates: Vec<f64>,

        /// Position size for every grid point.
        #[arg(long, default_value_t = 100.0)]
        quantity: f64,

        /// Run the grid on one thread.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Write the ranked table to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            output_dir,
            no_save,
        } => run_cmd(config, data, output_dir, no_save),
        Commands::Sweep {
            config,
            data,
            fast,
            slow,
            fee_rates,
            quantity,
            serial,
            output,
        } => sweep_cmd(config, data, fast, slow, fee_rates, quantity, serial, output),
    }
}

fn run_cmd(config: PathBuf, data: PathBuf, output_dir: PathBuf, no_save: bool) -> Result<()> {
    let result = run_files(&config, &data)
        .with_context(|| format!("backtest of {} failed", config.display()))?;

    println!();
    println!("{}", result.summary);
    println!("Run:            {}", result.fingerprint.run_id);
    if let Some(hash) = &result.fingerprint.output_hash {
        println!("Output hash:    {}", hash.short(16));
    }

    if !no_save {
        // Aborted runs keep their partial results.
        let run_dir = save_artifacts(&result, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    if let Some(error) = result.report.status.error() {
        bail!("run aborted: {error}");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn sweep_cmd(
    config: PathBuf,
    data: PathBuf,
    fast: Vec<usize>,
    slow: Vec<usize>,
    fee_rates: Vec<f64>,
    quantity: f64,
    serial: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let base = BacktestConfig::from_file(&config).with_context(|| {
        format!(
            "failed to load sweep base {} (a valid [strategy] table is required)",
            config.display()
        )
    })?;
    let feed = CsvFeed::new(&data)
        .load()
        .with_context(|| format!("failed to load {}", data.display()))?;

    let grid = ParamGrid {
        fast_periods: fast,
        slow_periods: slow,
        fee_models: fee_rates
            .into_iter()
            .map(|rate| {
                if rate == 0.0 {
                    FeeModel::None
                } else {
                    FeeModel::Proportional { rate }
                }
            })
            .collect(),
        quantity,
    };
    if grid.size() == 0 {
        bail!("empty grid: every fast period must be below some slow period");
    }

    let entries = ParamSweep::new()
        .with_parallelism(!serial)
        .run(&grid, &base, &feed)?;
    let ranked = rank_by_return(&entries);

    println!();
    println!(
        "{:<18} {:<22} {:>10} {:>12} {:>10} {:>7}",
        "Strategy", "Fees", "Status", "Return", "Max DD", "Fills"
    );
    println!("{}", "-".repeat(84));
    for &i in &ranked {
        let entry = &entries[i];
        let s = &entry.result.summary;
        println!(
            "{:<18} {:<22} {:>10} {:>11.2}% {:>9.2}% {:>7}",
            entry.label,
            entry.fee_model.label(),
            s.status,
            s.total_return * 100.0,
            s.max_drawdown * 100.0,
            s.fills
        );
    }

    if let Some(path) = output {
        let ordered: Vec<_> = ranked.iter().map(|&i| entries[i].clone()).collect();
        let csv = export_sweep_csv(&ordered)?;
        std::fs::write(&path, csv)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!();
        println!("Sweep table saved to: {}", path.display());
    }

    Ok(())
}
