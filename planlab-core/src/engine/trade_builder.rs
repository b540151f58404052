//! Trade builder: turns a resolved exit into a gross-P&L trade record.
//!
//! Pure function: trade state + exit outcome + instrument → `RawTrade`.

use crate::domain::{ExitReason, InstrumentContext, PlanLevels, RawTrade, TradePlan};
use crate::execution::{ExitOutcome, TradeState};

/// Level labels copied from the plan row that opened the trade.
#[derive(Debug, Clone, Copy)]
pub struct LevelTags<'a> {
    pub sl: &'a str,
    pub tp1: &'a str,
    pub tp2: &'a str,
}

impl<'a> LevelTags<'a> {
    pub fn from_plan(plan: &'a TradePlan) -> Self {
        Self {
            sl: &plan.sl_tag,
            tp1: &plan.tp1_tag,
            tp2: &plan.tp2_tag,
        }
    }

    fn for_exit(&self, reason: ExitReason) -> &'a str {
        match reason {
            ExitReason::SL => self.sl,
            ExitReason::BE => self.tp1,
            ExitReason::TP2 => self.tp2,
            ExitReason::TIMEOUT => "TIMEOUT",
        }
    }
}

/// Build the gross trade record.
///
/// ```text
/// tp1_leg = (tp1_price - entry) * sign * initial / 2     (if TP1 filled)
/// pnl     = tp1_leg + (exit - entry) * sign * remaining
/// pnl_usd = pnl / point_size * pip_value
/// risk    = |entry - sl| / point_size * pip_value * initial
/// ```
pub fn build_trade(
    symbol: &str,
    opened: &TradeState<'_>,
    levels: &PlanLevels,
    tags: LevelTags<'_>,
    outcome: &ExitOutcome,
    ctx: &InstrumentContext,
) -> RawTrade {
    let sign = opened.direction.sign();
    let entry = opened.entry_price;
    let initial = opened.initial_size;
    let to_usd = |price_lots: f64| price_lots / ctx.point_size * ctx.pip_value;

    let tp1_leg = outcome
        .tp1
        .map(|fill| (fill.price - entry) * sign * initial / 2.0)
        .unwrap_or(0.0);
    let remainder_leg = (outcome.exit.price - entry) * sign * outcome.position_size;
    let pnl = tp1_leg + remainder_leg;
    let pnl_usd = to_usd(pnl);

    let risk_usd = to_usd((entry - levels.sl).abs() * initial);
    let returns = if risk_usd > 0.0 { pnl_usd / risk_usd } else { 0.0 };

    RawTrade {
        symbol: symbol.to_string(),
        direction: opened.direction,
        entry_tag: opened.entry_tag.to_string(),
        entry_index: opened.entry_index,
        entry_time: opened.entry_time,
        entry_price: entry,
        sl: levels.sl,
        tp1: levels.tp1,
        tp2: levels.tp2,
        sl_tag: tags.sl.to_string(),
        tp1_tag: tags.tp1.to_string(),
        tp2_tag: tags.tp2.to_string(),
        stop_at_exit: outcome.stop_at_exit,
        initial_position_size: initial,
        position_size: outcome.position_size,
        tp1_executed: outcome.tp1.is_some(),
        tp1_price: outcome.tp1.map(|f| f.price),
        tp1_time: outcome.tp1.map(|f| f.time),
        exit_index: outcome.exit.index,
        exit_time: outcome.exit.time,
        exit_price: outcome.exit.price,
        exit_reason: outcome.exit.reason,
        exit_level_tag: tags.for_exit(outcome.exit.reason).to_string(),
        pnl,
        pnl_usd,
        tp1_pnl_usd: to_usd(tp1_leg),
        risk_usd,
        returns,
        duration_secs: (outcome.exit.time - opened.entry_time).num_seconds(),
    }
}
