//! Trade execution: how fills are classified and how open trades resolve.
//!
//! - **Policy**: market vs limit per fill, used for cost accounting
//! - **Exit simulator**: bar-by-bar TP1 / stop / TP2 state machine

pub mod exit;
pub mod policy;

pub use exit::{simulate_exit, ExitFill, ExitOutcome, Phase, TradeState, Tp1Fill};
pub use policy::ExecutionPolicy;
