//! PlanLab Core: domain types, exit simulation, execution loop, costs.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (candles, trade plans, instruments, trade records)
//! - Fixed-fractional risk sizing
//! - Bar-by-bar exit state machine with TP1 partial and breakeven stop
//! - Per-symbol execution loop with per-tag overlap suppression
//! - Spread, slippage and financing cost accounting
//! - Trade-table fingerprinting for determinism checks

pub mod backtester;
pub mod costs;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod fingerprint;
pub mod sizers;

pub use backtester::{BacktestError, Backtester};
