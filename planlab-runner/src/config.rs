//! Runner configuration, loaded from TOML.
//!
//! Every section is optional. A missing `[instruments]` table means the
//! builtin catalog; a missing `[financing]` table disables financing.

use planlab_core::costs::FinancingConfig;
use planlab_core::domain::{InstrumentCatalog, InstrumentSpec};
use planlab_core::execution::ExecutionPolicy;
use planlab_core::sizers::RiskSizer;
use planlab_core::Backtester;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Sizing and slippage shared by every unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub account_size: f64,
    pub max_risk_per_trade: f64,
    pub size_precision: u32,
    /// Default slippage in pips for instruments without an override.
    pub slippage_pips: f64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            account_size: 10_000.0,
            max_risk_per_trade: 0.005,
            size_precision: planlab_core::sizers::DEFAULT_SIZE_PRECISION,
            slippage_pips: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub parallel: bool,
    /// Worker threads. `None` uses rayon's global pool.
    pub threads: Option<usize>,
    pub output_dir: PathBuf,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            output_dir: PathBuf::from("results/backtests"),
        }
    }
}

/// One (strategy, symbol) job and where its inputs live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub strategy: String,
    pub symbol: String,
    pub candles: PathBuf,
    pub plans: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub execution: ExecutionPolicy,
    #[serde(default)]
    pub runner: RunnerSection,
    #[serde(default)]
    pub instruments: BTreeMap<String, InstrumentSpec>,
    #[serde(default)]
    pub financing: Option<FinancingConfig>,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

impl RunnerConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let b = &self.backtest;

        if !(b.account_size.is_finite() && b.account_size > 0.0) {
            return invalid(format!("account_size must be positive, got {}", b.account_size));
        }
        if !(b.max_risk_per_trade > 0.0 && b.max_risk_per_trade < 1.0) {
            return invalid(format!(
                "max_risk_per_trade must be in (0, 1), got {}",
                b.max_risk_per_trade
            ));
        }
        if !(b.slippage_pips.is_finite() && b.slippage_pips >= 0.0) {
            return invalid(format!("slippage_pips must be non-negative, got {}", b.slippage_pips));
        }
        if b.size_precision > 8 {
            return invalid(format!("size_precision must be at most 8, got {}", b.size_precision));
        }
        if self.runner.threads == Some(0) {
            return invalid("runner.threads must be at least 1".into());
        }

        if let Some(f) = &self.financing {
            if f.rollover_hour_utc > 23 || f.rollover_minute_utc > 59 {
                return invalid(format!(
                    "rollover time {:02}:{:02} is not a valid UTC time",
                    f.rollover_hour_utc, f.rollover_minute_utc
                ));
            }
            if f.triple_multiplier == 0 {
                return invalid("financing.triple_multiplier must be at least 1".into());
            }
        }

        let catalog = self.catalog();
        let mut seen = BTreeSet::new();
        for unit in &self.units {
            if !seen.insert((unit.strategy.as_str(), unit.symbol.as_str())) {
                return invalid(format!(
                    "duplicate unit ({}, {})",
                    unit.strategy, unit.symbol
                ));
            }
            if let Err(e) = catalog.context(&unit.symbol) {
                return invalid(e.to_string());
            }
        }
        Ok(())
    }

    /// Instrument catalog: configured instruments, or the builtin set if none.
    pub fn catalog(&self) -> InstrumentCatalog {
        let base = if self.instruments.is_empty() {
            InstrumentCatalog::builtin()
        } else {
            self.instruments
                .iter()
                .fold(InstrumentCatalog::new(), |cat, (symbol, spec)| {
                    cat.with_instrument(symbol, spec.clone())
                })
        };
        base.with_default_slippage_pips(self.backtest.slippage_pips)
    }

    pub fn sizer(&self) -> RiskSizer {
        RiskSizer::new(self.backtest.max_risk_per_trade, self.backtest.account_size)
            .with_precision(self.backtest.size_precision)
    }

    pub fn backtester(&self) -> Backtester {
        let bt = Backtester::new(self.catalog(), self.sizer()).with_policy(self.execution);
        match &self.financing {
            Some(f) => bt.with_financing(f.clone()),
            None => bt,
        }
    }
}

/// Resolve a unit's input path against the config file's directory.
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
