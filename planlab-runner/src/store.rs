//! On-disk result store.
//!
//! Layout: `<base>/<run_id>/{metadata.json, trades.csv, trades.json}`.
//! The run id is derived from the trade-table digest, so saving the same
//! outcome twice lands in the same directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use planlab_core::domain::TradeRecord;
use planlab_core::fingerprint::TableDigest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::export::{export_trades_csv, export_trades_json, import_trades_json};
use crate::runner::{RunOutcome, UnitFailure};

/// Schema version written into every `metadata.json`.
pub const SCHEMA_VERSION: u32 = 1;

const METADATA_FILE: &str = "metadata.json";
const TRADES_CSV: &str = "trades.csv";
const TRADES_JSON: &str = "trades.json";

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub unit_count: usize,
    pub trade_count: usize,
    pub failures: Vec<UnitFailure>,
    pub digest: TableDigest,
    pub net_pnl_usd: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub metadata: RunMetadata,
    pub trades: Vec<TradeRecord>,
}

/// `bt_` plus the first 8 hex characters of the digest.
pub fn run_id_for(digest: &TableDigest) -> String {
    format!("bt_{}", digest.short(8))
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    base: PathBuf,
}

impl ResultStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.base.join(run_id)
    }

    /// Persist a run outcome. Returns the run's directory.
    pub fn save(&self, outcome: &RunOutcome) -> Result<PathBuf> {
        let digest = outcome.digest().context("failed to digest trade table")?;
        let metadata = RunMetadata {
            schema_version: SCHEMA_VERSION,
            run_id: run_id_for(&digest),
            created_at: Utc::now(),
            unit_count: outcome.unit_count,
            trade_count: outcome.trades.len(),
            failures: outcome.failures.clone(),
            digest,
            net_pnl_usd: outcome.trades.iter().map(|t| t.pnl_net_usd).sum(),
        };

        let run_dir = self.run_dir(&metadata.run_id);
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create run dir: {}", run_dir.display()))?;

        let meta_json =
            serde_json::to_string_pretty(&metadata).context("failed to serialize metadata")?;
        write(&run_dir.join(METADATA_FILE), &meta_json)?;
        write(&run_dir.join(TRADES_CSV), &export_trades_csv(&outcome.trades)?)?;
        write(&run_dir.join(TRADES_JSON), &export_trades_json(&outcome.trades)?)?;

        info!(run_id = %metadata.run_id, dir = %run_dir.display(), "saved run");
        Ok(run_dir)
    }

    pub fn load_metadata(&self, run_id: &str) -> Result<RunMetadata> {
        let path = self.run_dir(run_id).join(METADATA_FILE);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let metadata: RunMetadata = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if metadata.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported schema version {} (max supported: {})",
                metadata.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(metadata)
    }

    /// Load a stored run, reading trades back from the lossless JSON copy.
    pub fn load(&self, run_id: &str) -> Result<StoredRun> {
        let metadata = self.load_metadata(run_id)?;
        let path = self.run_dir(run_id).join(TRADES_JSON);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let trades = import_trades_json(&json)?;
        if trades.len() != metadata.trade_count {
            bail!(
                "run {run_id}: metadata lists {} trades but {} were stored",
                metadata.trade_count,
                trades.len()
            );
        }
        Ok(StoredRun { metadata, trades })
    }

    /// Ids of every stored run, sorted. A missing base directory has no runs.
    pub fn list_runs(&self) -> Result<Vec<String>> {
        if !self.base.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.base)
            .with_context(|| format!("failed to list {}", self.base.display()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.path().join(METADATA_FILE).is_file() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
