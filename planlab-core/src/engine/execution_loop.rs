//! Execution loop: drives the exit simulator over every actionable plan of one symbol.
//!
//! Each direction is scanned independently in time order. Within a scan a
//! trade is refused while an earlier trade with the same entry tag is still
//! open, tracked with a per-scan map of tag → last exit time.

use super::trade_builder::{build_trade, LevelTags};
use super::EngineError;
use crate::domain::{validate_series, Candle, Direction, InstrumentContext, RawTrade, TradePlan};
use crate::execution::{simulate_exit, TradeState};
use crate::sizers::RiskSizer;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Run every actionable plan for `symbol`.
///
/// Trades come back in scan order: all longs, then all shorts, each in entry
/// order. Callers that need chronological order re-sort by exit time.
pub fn run_execution_loop(
    symbol: &str,
    candles: &[Candle],
    plans: &[TradePlan],
    ctx: &InstrumentContext,
    sizer: &RiskSizer,
) -> Result<Vec<RawTrade>, EngineError> {
    if plans.len() != candles.len() {
        return Err(EngineError::PlanLengthMismatch {
            candles: candles.len(),
            plans: plans.len(),
        });
    }
    validate_series(candles)?;

    let mut trades = Vec::new();
    for direction in [Direction::Long, Direction::Short] {
        scan_direction(symbol, direction, candles, plans, ctx, sizer, &mut trades);
    }

    debug!(symbol, trades = trades.len(), "execution loop finished");
    Ok(trades)
}

fn scan_direction(
    symbol: &str,
    direction: Direction,
    candles: &[Candle],
    plans: &[TradePlan],
    ctx: &InstrumentContext,
    sizer: &RiskSizer,
    out: &mut Vec<RawTrade>,
) {
    let mut last_exit_by_tag: HashMap<&str, DateTime<Utc>> = HashMap::new();

    for (index, (plan, candle)) in plans.iter().zip(candles).enumerate() {
        let Some(levels) = plan.actionable() else {
            continue;
        };
        if levels.direction != direction {
            continue;
        }

        let tag = plan.entry_tag.as_str();
        if let Some(&last_exit) = last_exit_by_tag.get(tag) {
            if last_exit > candle.time {
                trace!(symbol, %direction, tag, index, "plan overlaps an open trade, skipped");
                continue;
            }
        }

        let entry_price = candle.close + direction.sign() * ctx.slippage_abs;
        let size = sizer.size(entry_price, levels.sl, ctx);
        if size <= 0.0 {
            debug!(symbol, %direction, tag, index, "zero position size, plan dropped");
            continue;
        }

        let opened = TradeState::open(tag, index, candle.time, entry_price, &levels, size);
        let Some(outcome) = simulate_exit(opened, candles) else {
            continue;
        };

        let trade = build_trade(
            symbol,
            &opened,
            &levels,
            LevelTags::from_plan(plan),
            &outcome,
            ctx,
        );
        last_exit_by_tag.insert(tag, trade.exit_time);
        out.push(trade);
    }
}
