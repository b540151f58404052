//! Position Sizers: determine trade lots
//!
//! Sizers translate a risk budget and a stop distance into lots.
//! They never decide entries or exits.

pub mod risk;

pub use risk::{position_size, RiskSizer, DEFAULT_SIZE_PRECISION};
