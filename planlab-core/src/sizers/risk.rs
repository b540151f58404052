//! Fixed-fractional risk sizer
//!
//! Lots are chosen so that a stop-out loses a fixed fraction of the account.

use crate::domain::InstrumentContext;
use serde::{Deserialize, Serialize};

/// Lots are rounded to this many decimals unless configured otherwise.
pub const DEFAULT_SIZE_PRECISION: u32 = 3;

/// Compute lots for a trade risking `max_risk_fraction` of `account_size`.
///
/// # Formula
/// ```text
/// risk_amount  = max_risk_fraction * account_size
/// pip_distance = |entry - stop| / point_size
/// lots         = risk_amount / (pip_distance * pip_value)
/// ```
///
/// Returns 0 when entry equals stop or any input is non-finite or non-positive.
/// A zero result means the plan must be dropped.
pub fn position_size(
    entry_price: f64,
    stop_price: f64,
    max_risk_fraction: f64,
    account_size: f64,
    point_size: f64,
    pip_value: f64,
) -> f64 {
    sized(
        entry_price,
        stop_price,
        max_risk_fraction,
        account_size,
        point_size,
        pip_value,
        DEFAULT_SIZE_PRECISION,
    )
}

fn sized(
    entry_price: f64,
    stop_price: f64,
    max_risk_fraction: f64,
    account_size: f64,
    point_size: f64,
    pip_value: f64,
    precision: u32,
) -> f64 {
    let inputs = [
        entry_price,
        stop_price,
        max_risk_fraction,
        account_size,
        point_size,
        pip_value,
    ];
    if inputs.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }
    if max_risk_fraction <= 0.0 || account_size <= 0.0 || point_size <= 0.0 || pip_value <= 0.0 {
        return 0.0;
    }

    let distance = (entry_price - stop_price).abs();
    if distance == 0.0 {
        return 0.0;
    }

    let risk_amount = max_risk_fraction * account_size;
    let pip_distance = distance / point_size;
    let lots = risk_amount / (pip_distance * pip_value);

    round_to(lots, precision)
}

fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        0.0
    }
}

/// Risk sizer bound to an account and risk budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSizer {
    /// Fraction of the account risked per trade (e.g. 0.005 = 0.5%).
    pub max_risk_fraction: f64,
    pub account_size: f64,
    /// Decimal places lots are rounded to.
    pub precision: u32,
}

impl RiskSizer {
    pub fn new(max_risk_fraction: f64, account_size: f64) -> Self {
        Self {
            max_risk_fraction,
            account_size,
            precision: DEFAULT_SIZE_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Lots for a trade on the instrument described by `ctx`.
    pub fn size(&self, entry_price: f64, stop_price: f64, ctx: &InstrumentContext) -> f64 {
        sized(
            entry_price,
            stop_price,
            self.max_risk_fraction,
            self.account_size,
            ctx.point_size,
            ctx.pip_value,
            self.precision,
        )
    }
}

impl Default for RiskSizer {
    fn default() -> Self {
        Self::new(0.005, 10_000.0)
    }
}
