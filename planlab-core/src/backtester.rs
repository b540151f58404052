//! Backtester: execution loop plus cost engine for one symbol.
//!
//! Holds only immutable configuration, so one instance can serve any number of
//! concurrent `run` calls.

use crate::costs::{CostEngine, FinancingConfig};
use crate::domain::{Candle, InstrumentCatalog, InstrumentError, TradePlan, TradeRecord};
use crate::engine::{run_execution_loop, EngineError};
use crate::execution::ExecutionPolicy;
use crate::sizers::RiskSizer;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum BacktestError {
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error("symbol '{symbol}': {source}")]
    Engine {
        symbol: String,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Backtester {
    pub catalog: InstrumentCatalog,
    pub sizer: RiskSizer,
    pub costs: CostEngine,
}

impl Backtester {
    pub fn new(catalog: InstrumentCatalog, sizer: RiskSizer) -> Self {
        Self {
            catalog,
            sizer,
            costs: CostEngine::default(),
        }
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.costs.policy = policy;
        self
    }

    pub fn with_financing(mut self, financing: FinancingConfig) -> Self {
        self.costs.financing = Some(financing);
        self
    }

    /// Run every plan for `symbol` and return its costed trades in scan order.
    ///
    /// Fails immediately if the symbol has no instrument metadata.
    pub fn run(
        &self,
        symbol: &str,
        plans: &[TradePlan],
        candles: &[Candle],
    ) -> Result<Vec<TradeRecord>, BacktestError> {
        let ctx = self.catalog.context(symbol)?;

        let raw = run_execution_loop(symbol, candles, plans, &ctx, &self.sizer).map_err(
            |source| BacktestError::Engine {
                symbol: symbol.to_string(),
                source,
            },
        )?;

        let trades: Vec<TradeRecord> = raw
            .into_iter()
            .map(|trade| self.costs.apply(trade, &ctx))
            .collect();

        debug!(
            symbol,
            trades = trades.len(),
            net_usd = trades.iter().map(|t| t.pnl_net_usd).sum::<f64>(),
            "backtest finished"
        );
        Ok(trades)
    }
}

impl Default for Backtester {
    fn default() -> Self {
        Self::new(InstrumentCatalog::builtin(), RiskSizer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExitReason;
    use chrono::{Duration, TimeZone, Utc};

    fn candles() -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        [
            (100.0, 100.0, 100.0),
            (100.5, 99.5, 100.2),
            (103.0, 100.5, 102.8),
        ]
        .iter()
        .enumerate()
        .map(|(i, &(h, l, c))| Candle::new(t0 + Duration::minutes(5 * i as i64), c, h, l, c))
        .collect()
    }

    #[test]
    fn unknown_symbol_fails_fast() {
        let err = Backtester::default()
            .run("NOPE", &[], &[])
            .unwrap_err();
        assert!(matches!(
            err,
            BacktestError::Instrument(InstrumentError::MissingInstrumentMeta { .. })
        ));
    }

    #[test]
    fn length_mismatch_names_the_symbol() {
        let err = Backtester::default()
            .run("XAUUSD", &[TradePlan::none()], &candles())
            .unwrap_err();
        assert!(err.to_string().contains("XAUUSD"));
    }

    #[test]
    fn run_costs_every_trade() {
        let mut plans = vec![TradePlan::none(); 3];
        plans[0] = TradePlan::long("a", 99.0, 101.0, 102.0);
        let trades = Backtester::default().run("XAUUSD", &plans, &candles()).unwrap();

        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.trade.exit_reason, ExitReason::TP2);
        assert!(t.costs.spread_usd_total > 0.0);
        assert!(t.pnl_net_usd < t.trade.pnl_usd);
    }

    #[test]
    fn backtester_is_reentrant() {
        let bt = Backtester::default();
        let mut plans = vec![TradePlan::none(); 3];
        plans[0] = TradePlan::long("a", 99.0, 101.0, 102.0);
        let a = bt.run("XAUUSD", &plans, &candles()).unwrap();
        let b = bt.run("XAUUSD", &plans, &candles()).unwrap();
        assert_eq!(a, b);
    }
}
