//! Trade-table export: flat CSV for spreadsheets, JSON for lossless reload.

use anyhow::{Context, Result};
use planlab_core::domain::TradeRecord;

// ─── CSV ────────────────────────────────────────────────────────────

const CSV_HEADER: [&str; 48] = [
    "strategy",
    "symbol",
    "direction",
    "entry_tag",
    "entry_index",
    "entry_time",
    "entry_price",
    "sl",
    "tp1",
    "tp2",
    "stop_at_exit",
    "initial_position_size",
    "position_size",
    "tp1_executed",
    "tp1_price",
    "tp1_time",
    "exit_index",
    "exit_time",
    "exit_price",
    "exit_tag",
    "exit_level_tag",
    "pnl",
    "pnl_usd",
    "tp1_pnl_usd",
    "risk_usd",
    "returns",
    "duration_secs",
    "entry_exec_type",
    "tp1_exec_type",
    "exit_exec_type",
    "entry_notional",
    "tp1_notional",
    "exit_notional",
    "spread_usd_entry",
    "spread_usd_tp1",
    "spread_usd_exit",
    "spread_usd_total",
    "slippage_usd_entry",
    "slippage_usd_tp1",
    "slippage_usd_exit",
    "slippage_usd_total",
    "financing_rollovers",
    "financing_days",
    "financing_usd_overnight",
    "financing_usd_weekend",
    "financing_usd_total",
    "costs_usd_total",
    "pnl_net_usd",
];

fn opt_price(v: Option<f64>) -> String {
    v.map(|p| format!("{p:.6}")).unwrap_or_default()
}

/// Export trades as one flat row each, one column per cost component.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for r in trades {
        let t = &r.trade;
        let c = &r.costs;
        wtr.write_record([
            r.strategy.as_deref().unwrap_or(""),
            &t.symbol,
            t.direction.as_str(),
            &t.entry_tag,
            &t.entry_index.to_string(),
            &t.entry_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.sl),
            &opt_price(t.tp1),
            &opt_price(t.tp2),
            &format!("{:.6}", t.stop_at_exit),
            &format!("{:.3}", t.initial_position_size),
            &format!("{:.4}", t.position_size),
            &t.tp1_executed.to_string(),
            &opt_price(t.tp1_price),
            &t.tp1_time.map(|tm| tm.to_rfc3339()).unwrap_or_default(),
            &t.exit_index.to_string(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.exit_price),
            t.exit_reason.as_str(),
            &t.exit_level_tag,
            &format!("{:.6}", t.pnl),
            &format!("{:.4}", t.pnl_usd),
            &format!("{:.4}", t.tp1_pnl_usd),
            &format!("{:.4}", t.risk_usd),
            &format!("{:.6}", t.returns),
            &t.duration_secs.to_string(),
            c.entry_exec_type.as_str(),
            c.tp1_exec_type.map(|e| e.as_str()).unwrap_or(""),
            c.exit_exec_type.as_str(),
            &format!("{:.4}", c.entry_notional),
            &format!("{:.4}", c.tp1_notional),
            &format!("{:.4}", c.exit_notional),
            &format!("{:.4}", c.spread_usd_entry),
            &format!("{:.4}", c.spread_usd_tp1),
            &format!("{:.4}", c.spread_usd_exit),
            &format!("{:.4}", c.spread_usd_total),
            &format!("{:.4}", c.slippage_usd_entry),
            &format!("{:.4}", c.slippage_usd_tp1),
            &format!("{:.4}", c.slippage_usd_exit),
            &format!("{:.4}", c.slippage_usd_total),
            &c.financing_rollovers.to_string(),
            &c.financing_days.to_string(),
            &format!("{:.4}", c.financing_usd_overnight),
            &format!("{:.4}", c.financing_usd_weekend),
            &format!("{:.4}", c.financing_usd_total),
            &format!("{:.4}", c.costs_usd_total),
            &format!("{:.4}", r.pnl_net_usd),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_trades_json(trades: &[TradeRecord]) -> Result<String> {
    serde_json::to_string_pretty(trades).context("failed to serialize trades to JSON")
}

pub fn import_trades_json(json: &str) -> Result<Vec<TradeRecord>> {
    serde_json::from_str(json).context("failed to deserialize trades from JSON")
}
