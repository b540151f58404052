//! PlanLab Runner: orchestration around the core backtester.
//!
//! - TOML configuration for sizing, execution types, instruments and financing
//! - CSV loading of candle and plan tables
//! - Parallel (strategy, symbol) units with per-unit failure isolation
//! - Trade-table export and an on-disk result store

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod store;

pub use config::{ConfigError, RunnerConfig, UnitSpec};
pub use data_loader::LoadError;
pub use runner::{BacktestUnit, RunError, RunOutcome, Runner, UnitFailure};
pub use store::{ResultStore, RunMetadata, StoredRun};

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Runner>();
        require_sync::<Runner>();
        require_send::<BacktestUnit>();
        require_sync::<BacktestUnit>();
        require_send::<RunOutcome>();
        require_sync::<RunOutcome>();

        require_send::<RunError>();
        require_sync::<RunError>();
        require_send::<LoadError>();
        require_sync::<LoadError>();
        require_send::<ConfigError>();
        require_sync::<ConfigError>();
    }
}
