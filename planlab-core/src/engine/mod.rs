//! Backtesting engine: per-symbol execution loop and trade construction.
//!
//! The engine consumes a candle series and a row-aligned plan table, then for
//! each actionable plan:
//!
//! 1. Enters at the bar close, adjusted by slippage against the trade
//! 2. Sizes the trade from the stop distance
//! 3. Resolves the exit with the bar-by-bar simulator
//! 4. Builds the gross trade record

pub mod execution_loop;
pub mod trade_builder;

pub use execution_loop::run_execution_loop;
pub use trade_builder::{build_trade, LevelTags};

use crate::domain::CandleError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("plan table has {plans} rows but candle series has {candles}")]
    PlanLengthMismatch { candles: usize, plans: usize },

    #[error(transparent)]
    Candles(#[from] CandleError),
}
