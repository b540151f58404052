//! Backtest runner: fans (strategy, symbol) units out over a rayon pool.
//!
//! Units are independent. Each one runs inside `catch_unwind`, so an error
//! or a panic in one unit becomes a [`UnitFailure`] and the rest of the run
//! continues. The merged trade table is stamped with each unit's strategy
//! and sorted canonically, which makes serial and parallel runs produce the
//! same table byte for byte.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use planlab_core::domain::{sort_canonical, Candle, TradePlan, TradeRecord};
use planlab_core::fingerprint::{trade_table_digest, TableDigest};
use planlab_core::Backtester;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{resolve_path, ConfigError, RunnerConfig, UnitSpec};
use crate::data_loader::{load_candles, load_plans};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to digest trade table: {0}")]
    Digest(#[from] serde_json::Error),
}

/// One strategy's plans for one symbol, already in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestUnit {
    pub strategy: String,
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub plans: Vec<TradePlan>,
}

/// A unit that produced no trades because it errored or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub strategy: String,
    pub symbol: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Canonically sorted trades of every successful unit.
    pub trades: Vec<TradeRecord>,
    /// Failed units, in input order.
    pub failures: Vec<UnitFailure>,
    pub unit_count: usize,
}

impl RunOutcome {
    pub fn digest(&self) -> Result<TableDigest, serde_json::Error> {
        trade_table_digest(&self.trades)
    }

    pub fn succeeded(&self) -> usize {
        self.unit_count - self.failures.len()
    }
}

#[derive(Debug, Clone)]
pub struct Runner {
    pub backtester: Backtester,
    pub parallel: bool,
    /// Dedicated pool size. `None` runs on rayon's global pool.
    pub threads: Option<usize>,
}

impl Runner {
    pub fn new(backtester: Backtester) -> Self {
        Self {
            backtester,
            parallel: true,
            threads: None,
        }
    }

    pub fn serial(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.parallel = true;
        self.threads = Some(threads);
        self
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            backtester: config.backtester(),
            parallel: config.runner.parallel,
            threads: config.runner.threads,
        }
    }

    /// Backtest in-memory units.
    pub fn run(&self, units: &[BacktestUnit]) -> Result<RunOutcome, RunError> {
        self.run_with(units, |u| (u.strategy.as_str(), u.symbol.as_str()), |u| {
            self.backtester
                .run(&u.symbol, &u.plans, &u.candles)
                .map_err(|e| e.to_string())
        })
    }

    /// Load and backtest every unit a config names. Relative input paths are
    /// resolved against `base_dir`. A unit whose files fail to load is a
    /// failure like any other.
    pub fn run_config(config: &RunnerConfig, base_dir: &Path) -> Result<RunOutcome, RunError> {
        config.validate()?;
        let runner = Self::from_config(config);
        runner.run_with(
            &config.units,
            |u| (u.strategy.as_str(), u.symbol.as_str()),
            |u| runner.load_and_run(u, base_dir),
        )
    }

    fn load_and_run(&self, unit: &UnitSpec, base_dir: &Path) -> Result<Vec<TradeRecord>, String> {
        let candles = load_candles(&resolve_path(base_dir, &unit.candles))
            .map_err(|e| format!("candles: {e}"))?;
        let plans =
            load_plans(&resolve_path(base_dir, &unit.plans)).map_err(|e| format!("plans: {e}"))?;
        self.backtester
            .run(&unit.symbol, &plans, &candles)
            .map_err(|e| e.to_string())
    }

    fn run_with<U, K, F>(&self, units: &[U], key: K, work: F) -> Result<RunOutcome, RunError>
    where
        U: Sync,
        K: Fn(&U) -> (&str, &str) + Sync,
        F: Fn(&U) -> Result<Vec<TradeRecord>, String> + Sync,
    {
        info!(
            units = units.len(),
            parallel = self.parallel,
            threads = ?self.threads,
            "starting backtest run"
        );

        let job = |unit: &U| isolated(|| work(unit));

        let results: Vec<Result<Vec<TradeRecord>, String>> = if !self.parallel {
            units.iter().map(job).collect()
        } else if let Some(n) = self.threads {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| units.par_iter().map(job).collect())
        } else {
            units.par_iter().map(job).collect()
        };

        let mut trades = Vec::new();
        let mut failures = Vec::new();
        for (unit, result) in units.iter().zip(results) {
            let (strategy, symbol) = key(unit);
            match result {
                Ok(unit_trades) => {
                    info!(strategy, symbol, trades = unit_trades.len(), "unit finished");
                    trades.extend(unit_trades.into_iter().map(|mut t| {
                        t.strategy = Some(strategy.to_string());
                        t
                    }));
                }
                Err(message) => {
                    error!(strategy, symbol, %message, "unit failed");
                    failures.push(UnitFailure {
                        strategy: strategy.to_string(),
                        symbol: symbol.to_string(),
                        message,
                    });
                }
            }
        }

        sort_canonical(&mut trades);
        info!(
            trades = trades.len(),
            failed = failures.len(),
            "backtest run finished"
        );

        Ok(RunOutcome {
            trades,
            failures,
            unit_count: units.len(),
        })
    }
}

/// Run `f`, turning a panic into an `Err` carrying the panic message.
fn isolated<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, String>,
{
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(panic_message(payload)))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
