//! Trade-table fingerprinting: a byte-level identity for determinism checks.
//!
//! Two runs over the same inputs must produce the same digest, whether the
//! units ran serially or in parallel.

use crate::domain::TradeRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 digest of a trade table, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableDigest(pub String);

impl TableDigest {
    /// First `n` hex characters, for display and run ids.
    pub fn short(&self, n: usize) -> &str {
        &self.0[..n.min(self.0.len())]
    }
}

impl fmt::Display for TableDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash the table in the order given. Callers sort canonically first.
///
/// Each record is serialized as one JSON line, so field order is the struct
/// declaration order and floats use serde_json's shortest round-trip form.
pub fn trade_table_digest(trades: &[TradeRecord]) -> Result<TableDigest, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    for trade in trades {
        serde_json::to_writer(&mut hasher, trade)?;
        hasher.update(b"\n");
    }
    Ok(TableDigest(hasher.finalize().to_hex().to_string()))
}
