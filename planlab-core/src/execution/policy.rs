//! Execution policy: which broker order type each fill uses.
//!
//! Classification only drives cost accounting. Fill prices are decided by the
//! exit simulator, not here.

use crate::domain::{ExecType, ExitReason};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionPolicy {
    /// Entry at bar close.
    pub entry_type: ExecType,
    /// TP1 and TP2.
    pub tp_type: ExecType,
    /// SL and BE.
    pub stop_type: ExecType,
    pub timeout_type: ExecType,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            entry_type: ExecType::Market,
            tp_type: ExecType::Limit,
            stop_type: ExecType::Market,
            timeout_type: ExecType::Market,
        }
    }
}

impl ExecutionPolicy {
    /// Execution type of the fill that closed a trade for `reason`.
    pub fn classify_exit(&self, reason: ExitReason) -> ExecType {
        match reason {
            ExitReason::SL | ExitReason::BE => self.stop_type,
            ExitReason::TP2 => self.tp_type,
            ExitReason::TIMEOUT => self.timeout_type,
        }
    }

    pub fn classify_tp1(&self) -> ExecType {
        self.tp_type
    }

    pub fn classify_entry(&self) -> ExecType {
        self.entry_type
    }
}
