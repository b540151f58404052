//! Transaction costs: spread, slippage and overnight financing.
//!
//! Costs never move fill prices. They are computed after the exit is known and
//! netted against gross P&L.

pub mod engine;
pub mod financing;

pub use engine::{net_pnl, CostEngine};
pub use financing::{
    rollover_times, DirectionalRates, FinancingCharge, FinancingConfig, FinancingModel,
};
