//! Cost engine integration tests through the backtester.
//!
//! Tests:
//! 1. One rollover on an ordinary weekday charges one day at the long rate
//! 2. The triple-rollover weekday charges three days at once
//! 3. Notional-rate model
//! 4. Lots open at a rollover after TP1 are the remainder
//! 5. Unconfigured symbol or direction charges nothing
//! 6. Net P&L identity on every trade

use chrono::{DateTime, TimeZone, Utc, Weekday};
use planlab_core::costs::{DirectionalRates, FinancingConfig, FinancingModel};
use planlab_core::domain::{
    Candle, InstrumentCatalog, InstrumentSpec, Spread, TradePlan, TradeRecord,
};
use planlab_core::sizers::RiskSizer;
use planlab_core::Backtester;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// March 2025: the 3rd is a Monday, the 5th a Wednesday.
fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
}

fn quiet(time: DateTime<Utc>) -> Candle {
    Candle::new(time, 100.0, 100.4, 99.6, 100.0)
}

fn financing(rates: DirectionalRates) -> FinancingConfig {
    FinancingConfig::default().with_rates("TEST", rates)
}

fn backtester(financing: FinancingConfig) -> Backtester {
    let catalog = InstrumentCatalog::new().with_instrument(
        "TEST",
        InstrumentSpec::new(0.01, 1.0).with_contract_size(100.0),
    );
    Backtester::new(catalog, RiskSizer::new(0.005, 10_000.0)).with_financing(financing)
}

/// A single long (0.5 lots) held from `entry` to the timeout at `exit`.
fn held_long(bt: &Backtester, entry: DateTime<Utc>, exit: DateTime<Utc>) -> TradeRecord {
    let candles = vec![quiet(entry), quiet(exit)];
    let plans = vec![TradePlan::long("f", 99.0, 101.0, 102.0), TradePlan::none()];
    let mut trades = bt.run("TEST", &plans, &candles).unwrap();
    assert_eq!(trades.len(), 1);
    trades.remove(0)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ──────────────────────────────────────────────
// Financing
// ──────────────────────────────────────────────

#[test]
fn ordinary_rollover_charges_one_day() {
    let bt = backtester(financing(DirectionalRates::new(2.0, 1.0)));
    // Monday 20:00 → Tuesday 02:00 crosses Monday 22:00
    let r = held_long(&bt, at(3, 20), at(4, 2));

    assert_eq!(r.costs.financing_rollovers, 1);
    assert_eq!(r.costs.financing_days, 1);
    // 0.5 lots * $2
    assert!(approx(r.costs.financing_usd_overnight, 1.0));
    assert_eq!(r.costs.financing_usd_weekend, 0.0);
    assert!(approx(r.costs.financing_usd_total, 1.0));
}

#[test]
fn triple_weekday_charges_three_days() {
    let bt = backtester(financing(DirectionalRates::new(2.0, 1.0)));
    // Wednesday 20:00 → Thursday 02:00 crosses the Wednesday rollover
    let r = held_long(&bt, at(5, 20), at(6, 2));

    assert_eq!(r.costs.financing_rollovers, 1);
    assert_eq!(r.costs.financing_days, 3);
    assert!(approx(r.costs.financing_usd_overnight, 1.0));
    assert!(approx(r.costs.financing_usd_weekend, 2.0));
    assert!(approx(r.costs.financing_usd_total, 3.0));
}

#[test]
fn triple_weekday_is_configurable() {
    let mut cfg = financing(DirectionalRates::new(2.0, 1.0));
    cfg.triple_rollover_weekday = Weekday::Fri;
    let bt = backtester(cfg);
    let r = held_long(&bt, at(5, 20), at(6, 2));
    assert_eq!(r.costs.financing_days, 1);
}

#[test]
fn multi_day_hold_accumulates_each_rollover() {
    let bt = backtester(financing(DirectionalRates::new(2.0, 1.0)));
    // Monday 20:00 → Thursday 02:00: Mon, Tue, Wed(x3)
    let r = held_long(&bt, at(3, 20), at(6, 2));
    assert_eq!(r.costs.financing_rollovers, 3);
    assert_eq!(r.costs.financing_days, 5);
    assert!(approx(r.costs.financing_usd_total, 5.0));
}

#[test]
fn notional_rate_model() {
    let cfg =
        financing(DirectionalRates::new(0.0001, 0.0)).with_model(FinancingModel::NotionalRate);
    let bt = backtester(cfg);
    let r = held_long(&bt, at(3, 20), at(4, 2));
    // 100.0 * 0.5 lots * 100 contract * 0.0001
    assert!(approx(r.costs.financing_usd_total, 0.5));
}

#[test]
fn remainder_lots_after_tp1_are_financed() {
    let bt = backtester(financing(DirectionalRates::new(2.0, 1.0)));
    let candles = vec![
        quiet(at(3, 12)),
        Candle::new(at(3, 18), 100.6, 101.5, 100.5, 101.0), // TP1 before Monday rollover
        quiet(at(4, 2)),
    ];
    let plans = vec![
        TradePlan::long("f", 99.0, 101.0, 105.0),
        TradePlan::none(),
        TradePlan::none(),
    ];
    let trades = bt.run("TEST", &plans, &candles).unwrap();
    let r = &trades[0];
    assert!(r.trade.tp1_executed);
    // 0.25 lots * $2
    assert!(approx(r.costs.financing_usd_total, 0.5));
}

#[test]
fn unconfigured_rates_charge_nothing() {
    let short_only = backtester(financing(DirectionalRates::new(0.0, 1.0)));
    let r = held_long(&short_only, at(3, 20), at(4, 2));
    assert_eq!(r.costs.financing_usd_total, 0.0);

    let other_symbol = backtester(
        FinancingConfig::default().with_rates("OTHER", DirectionalRates::new(5.0, 5.0)),
    );
    let r = held_long(&other_symbol, at(3, 20), at(4, 2));
    assert_eq!(r.costs.financing_usd_total, 0.0);
    assert_eq!(r.costs.financing_rollovers, 0);
}

// ──────────────────────────────────────────────
// Net P&L
// ──────────────────────────────────────────────

#[test]
fn net_pnl_identity_with_every_cost_present() {
    let catalog = InstrumentCatalog::new()
        .with_default_slippage_pips(3.0)
        .with_instrument(
            "TEST",
            InstrumentSpec::new(0.01, 1.0).with_spread(Spread::Points(0.2)),
        );
    let bt = Backtester::new(catalog, RiskSizer::new(0.005, 10_000.0))
        .with_financing(financing(DirectionalRates::new(2.0, 1.5)));

    let candles = vec![
        quiet(at(3, 12)),
        Candle::new(at(3, 18), 100.6, 101.5, 100.5, 101.0),
        quiet(at(4, 2)),
        Candle::new(at(4, 6), 100.0, 100.2, 97.0, 97.5),
    ];
    let plans = vec![
        TradePlan::long("l", 99.0, 101.0, 105.0),
        TradePlan::short("s", 102.0, 99.0, 98.0),
        TradePlan::none(),
        TradePlan::none(),
    ];

    let trades = bt.run("TEST", &plans, &candles).unwrap();
    assert_eq!(trades.len(), 2);
    for r in &trades {
        let c = &r.costs;
        assert_eq!(
            r.pnl_net_usd,
            r.trade.pnl_usd - (c.spread_usd_total + c.slippage_usd_total + c.financing_usd_total)
        );
        assert!(approx(
            c.costs_usd_total,
            c.spread_usd_total + c.slippage_usd_total + c.financing_usd_total
        ));
        assert!(c.spread_usd_total > 0.0);
        assert!(c.slippage_usd_entry > 0.0);
    }
}
