//! Domain types for PlanLab

pub mod candle;
pub mod instrument;
pub mod plan;
pub mod trade;

pub use candle::{validate_series, Candle, CandleError};
pub use instrument::{InstrumentCatalog, InstrumentContext, InstrumentError, InstrumentSpec, Spread};
pub use plan::{Direction, ExitMode, PlanLevels, TradePlan};
pub use trade::{sort_canonical, CostBreakdown, ExecType, ExitReason, RawTrade, TradeRecord};

/// Symbol type alias
pub type Symbol = String;
