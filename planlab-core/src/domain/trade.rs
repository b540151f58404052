//! Trade records: the closed-trade output of the execution loop and cost engine.

use super::plan::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Why a trade closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum ExitReason {
    /// Original stop hit before TP1.
    SL,
    /// Breakeven stop hit after TP1.
    BE,
    TP2,
    /// Data ran out with the trade still open.
    TIMEOUT,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::SL => "SL",
            ExitReason::BE => "BE",
            ExitReason::TP2 => "TP2",
            ExitReason::TIMEOUT => "TIMEOUT",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broker execution type of a single fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecType {
    /// Crosses the book; pays slippage.
    Market,
    /// Rests at a level; fills at the level price.
    Limit,
}

impl ExecType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecType::Market => "market",
            ExecType::Limit => "limit",
        }
    }

    pub fn pays_slippage(self) -> bool {
        self == ExecType::Market
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed trade before costs are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    // ── Identification ──
    pub symbol: String,
    pub direction: Direction,
    pub entry_tag: String,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Levels ──
    pub sl: f64,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub sl_tag: String,
    pub tp1_tag: String,
    pub tp2_tag: String,
    /// Stop in force at exit: `sl`, or `entry_price` once TP1 filled.
    pub stop_at_exit: f64,

    // ── Size ──
    pub initial_position_size: f64,
    /// Size still open at exit.
    pub position_size: f64,

    // ── TP1 partial ──
    pub tp1_executed: bool,
    pub tp1_price: Option<f64>,
    pub tp1_time: Option<DateTime<Utc>>,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    #[serde(rename = "exit_tag")]
    pub exit_reason: ExitReason,
    pub exit_level_tag: String,

    // ── PnL ──
    /// Gross P&L in price × lots.
    pub pnl: f64,
    pub pnl_usd: f64,
    pub tp1_pnl_usd: f64,
    pub risk_usd: f64,
    /// `pnl_usd / risk_usd`, 0 when there is no risk.
    pub returns: f64,

    pub duration_secs: i64,
}

/// Every cost component of one trade, exposed for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    // ── Execution types ──
    pub entry_exec_type: ExecType,
    pub tp1_exec_type: Option<ExecType>,
    pub exit_exec_type: ExecType,

    // ── Notional ──
    pub entry_notional: f64,
    pub tp1_notional: f64,
    pub exit_notional: f64,

    // ── Spread ──
    pub spread_usd_entry: f64,
    pub spread_usd_tp1: f64,
    pub spread_usd_exit: f64,
    pub spread_usd_total: f64,

    // ── Slippage ──
    pub slippage_usd_entry: f64,
    pub slippage_usd_tp1: f64,
    pub slippage_usd_exit: f64,
    pub slippage_usd_total: f64,

    // ── Financing ──
    pub financing_rollovers: u32,
    /// Days charged, counting the triple rollover as `multiplier` days.
    pub financing_days: u32,
    pub financing_usd_overnight: f64,
    pub financing_usd_weekend: f64,
    pub financing_usd_total: f64,

    pub costs_usd_total: f64,
}

/// A finished trade: raw trade, its costs, and net P&L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(flatten)]
    pub trade: RawTrade,
    pub costs: CostBreakdown,
    pub pnl_net_usd: f64,
}

impl TradeRecord {
    /// Order used for the merged trade table:
    /// exit_time, symbol, strategy, entry_time, direction, entry_tag.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.trade
            .exit_time
            .cmp(&other.trade.exit_time)
            .then_with(|| self.trade.symbol.cmp(&other.trade.symbol))
            .then_with(|| self.strategy.cmp(&other.strategy))
            .then_with(|| self.trade.entry_time.cmp(&other.trade.entry_time))
            .then_with(|| self.trade.direction.cmp(&other.trade.direction))
            .then_with(|| self.trade.entry_tag.cmp(&other.trade.entry_tag))
    }

    pub fn is_winner(&self) -> bool {
        self.pnl_net_usd > 0.0
    }
}

/// Sort a trade table into canonical order. Stable, so exact ties keep input order.
pub fn sort_canonical(trades: &mut [TradeRecord]) {
    trades.sort_by(TradeRecord::canonical_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, hour, 0, 0).unwrap()
    }

    fn sample_raw() -> RawTrade {
        RawTrade {
            symbol: "XAUUSD".into(),
            direction: Direction::Long,
            entry_tag: "breakout".into(),
            entry_index: 3,
            entry_time: ts(1),
            entry_price: 100.0,
            sl: 99.0,
            tp1: Some(101.0),
            tp2: Some(102.0),
            sl_tag: "SL".into(),
            tp1_tag: "TP1".into(),
            tp2_tag: "TP2".into(),
            stop_at_exit: 100.0,
            initial_position_size: 0.5,
            position_size: 0.25,
            tp1_executed: true,
            tp1_price: Some(101.0),
            tp1_time: Some(ts(2)),
            exit_index: 6,
            exit_time: ts(4),
            exit_price: 100.0,
            exit_reason: ExitReason::BE,
            exit_level_tag: "TP1".into(),
            pnl: 0.25,
            pnl_usd: 25.0,
            tp1_pnl_usd: 25.0,
            risk_usd: 50.0,
            returns: 0.5,
            duration_secs: 3 * 3600,
        }
    }

    fn zero_costs() -> CostBreakdown {
        CostBreakdown {
            entry_exec_type: ExecType::Market,
            tp1_exec_type: Some(ExecType::Limit),
            exit_exec_type: ExecType::Market,
            entry_notional: 50.0,
            tp1_notional: 25.25,
            exit_notional: 25.0,
            spread_usd_entry: 0.0,
            spread_usd_tp1: 0.0,
            spread_usd_exit: 0.0,
            spread_usd_total: 0.0,
            slippage_usd_entry: 0.0,
            slippage_usd_tp1: 0.0,
            slippage_usd_exit: 0.0,
            slippage_usd_total: 0.0,
            financing_rollovers: 0,
            financing_days: 0,
            financing_usd_overnight: 0.0,
            financing_usd_weekend: 0.0,
            financing_usd_total: 0.0,
            costs_usd_total: 0.0,
        }
    }

    fn record(strategy: &str, symbol: &str, exit_hour: u32) -> TradeRecord {
        let mut trade = sample_raw();
        trade.symbol = symbol.into();
        trade.exit_time = ts(exit_hour);
        TradeRecord {
            strategy: Some(strategy.into()),
            trade,
            costs: zero_costs(),
            pnl_net_usd: 25.0,
        }
    }

    #[test]
    fn exit_reason_serializes_as_exit_tag() {
        let json = serde_json::to_value(sample_raw()).unwrap();
        assert_eq!(json["exit_tag"], "BE");
        assert!(json.get("exit_reason").is_none());
    }

    #[test]
    fn record_json_is_flat_over_raw_trade() {
        let json = serde_json::to_value(record("s", "XAUUSD", 4)).unwrap();
        assert_eq!(json["symbol"], "XAUUSD");
        assert_eq!(json["strategy"], "s");
        assert_eq!(json["costs"]["entry_exec_type"], "market");

        let back: TradeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record("s", "XAUUSD", 4));
    }

    #[test]
    fn canonical_order_is_exit_time_first() {
        let mut trades = vec![
            record("b", "XAUUSD", 5),
            record("a", "XAUUSD", 4),
            record("a", "EURUSD", 5),
        ];
        sort_canonical(&mut trades);
        let keys: Vec<(u32, &str, &str)> = trades
            .iter()
            .map(|t| {
                (
                    chrono::Timelike::hour(&t.trade.exit_time),
                    t.trade.symbol.as_str(),
                    t.strategy.as_deref().unwrap_or(""),
                )
            })
            .collect();
        assert_eq!(
            keys,
            vec![(4, "XAUUSD", "a"), (5, "EURUSD", "a"), (5, "XAUUSD", "b")]
        );
    }

    #[test]
    fn exec_type_slippage_rule() {
        assert!(ExecType::Market.pays_slippage());
        assert!(!ExecType::Limit.pays_slippage());
    }
}
