//! PlanLab CLI: run configured backtests and inspect stored results.
//!
//! Commands:
//! - `run`: execute every unit of a TOML config and save the trade table
//! - `runs list`: list stored run ids
//! - `runs show`: print a stored run's metadata
//! - `instruments`: print the instrument catalog a config resolves to

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use planlab_core::domain::ExitReason;
use planlab_runner::{ResultStore, RunOutcome, Runner, RunnerConfig};

#[derive(Parser)]
#[command(
    name = "planlab",
    about = "PlanLab CLI: bar-by-bar backtester for precomputed trade plans"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override `runner.output_dir` from the config.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Run units one at a time.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Print the summary without writing results.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Stored run commands.
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
    /// Print instrument metadata.
    Instruments {
        /// Config whose `[instruments]` table to print. Defaults to the builtin catalog.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RunsAction {
    /// List stored run ids.
    List {
        #[arg(long, default_value = "results/backtests")]
        dir: PathBuf,
    },
    /// Print a stored run's metadata.
    Show {
        run_id: String,

        #[arg(long, default_value = "results/backtests")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            serial,
            no_save,
        } => run_cmd(&config, output_dir, serial, no_save),
        Commands::Runs { action } => match action {
            RunsAction::List { dir } => runs_list(&dir),
            RunsAction::Show { run_id, dir } => runs_show(&dir, &run_id),
        },
        Commands::Instruments { config } => instruments_cmd(config.as_deref()),
    }
}

fn run_cmd(
    config_path: &Path,
    output_dir: Option<PathBuf>,
    serial: bool,
    no_save: bool,
) -> Result<()> {
    let mut config = RunnerConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    if serial {
        config.runner.parallel = false;
    }
    if config.units.is_empty() {
        bail!("config {} defines no [[units]]", config_path.display());
    }

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let outcome = Runner::run_config(&config, base_dir).context("backtest run failed")?;
    print_summary(&outcome)?;

    if outcome.failures.len() == outcome.unit_count {
        bail!("all {} units failed", outcome.unit_count);
    }

    if !no_save {
        let dir = output_dir.unwrap_or_else(|| config.runner.output_dir.clone());
        let store = ResultStore::new(dir);
        let run_dir = store.save(&outcome)?;
        info!(dir = %run_dir.display(), "results written");
        println!("Saved to {}", run_dir.display());
    }
    Ok(())
}

fn print_summary(outcome: &RunOutcome) -> Result<()> {
    let trades = &outcome.trades;
    let gross: f64 = trades.iter().map(|t| t.trade.pnl_usd).sum();
    let net: f64 = trades.iter().map(|t| t.pnl_net_usd).sum();
    let costs: f64 = trades.iter().map(|t| t.costs.costs_usd_total).sum();
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    let count_of = |reason: ExitReason| {
        trades
            .iter()
            .filter(|t| t.trade.exit_reason == reason)
            .count()
    };

    println!(
        "Units: {} ok, {} failed",
        outcome.succeeded(),
        outcome.failures.len()
    );
    println!("Trades: {} ({} net winners)", trades.len(), winners);
    println!(
        "Exits: SL {} | BE {} | TP2 {} | TIMEOUT {}",
        count_of(ExitReason::SL),
        count_of(ExitReason::BE),
        count_of(ExitReason::TP2),
        count_of(ExitReason::TIMEOUT)
    );
    println!("Gross P&L: {gross:.2} USD");
    println!("Costs:     {costs:.2} USD");
    println!("Net P&L:   {net:.2} USD");
    println!("Digest:    {}", outcome.digest()?.short(16));

    for f in &outcome.failures {
        eprintln!("FAILED {} / {}: {}", f.strategy, f.symbol, f.message);
    }
    Ok(())
}

fn runs_list(dir: &Path) -> Result<()> {
    let store = ResultStore::new(dir);
    let ids = store.list_runs()?;
    if ids.is_empty() {
        println!("No runs in {}", dir.display());
        return Ok(());
    }
    for id in ids {
        let meta = store.load_metadata(&id)?;
        println!(
            "{id}  {}  units={} trades={} failed={} net={:.2}",
            meta.created_at.format("%Y-%m-%d %H:%M:%S"),
            meta.unit_count,
            meta.trade_count,
            meta.failures.len(),
            meta.net_pnl_usd
        );
    }
    Ok(())
}

fn runs_show(dir: &Path, run_id: &str) -> Result<()> {
    let store = ResultStore::new(dir);
    let meta = store
        .load_metadata(run_id)
        .with_context(|| format!("no stored run '{run_id}' in {}", dir.display()))?;
    let json = serde_json::to_string_pretty(&meta).context("failed to serialize metadata")?;
    println!("{json}");
    Ok(())
}

fn instruments_cmd(config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => RunnerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunnerConfig::default(),
    };
    let catalog = config.catalog();

    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>12} {:>10}",
        "symbol", "point", "pip_value", "contract", "spread_abs", "slip_abs"
    );
    for symbol in catalog.symbols() {
        let ctx = catalog.context(symbol)?;
        println!(
            "{:<12} {:>10} {:>10} {:>10} {:>12} {:>10}",
            ctx.symbol,
            ctx.point_size,
            ctx.pip_value,
            ctx.contract_size,
            ctx.spread_abs,
            ctx.slippage_abs
        );
    }
    Ok(())
}
