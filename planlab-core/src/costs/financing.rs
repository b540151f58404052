//! Overnight financing (swap) charged at each daily rollover a trade stays open through.

use crate::domain::{Direction, InstrumentContext, RawTrade};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a daily rate turns into a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingModel {
    /// `lots * usd_per_lot * days`
    #[default]
    UsdPerLotDay,
    /// `entry_price * lots * contract_size * rate * days`
    NotionalRate,
}

/// Daily rate per direction. Positive values are costs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DirectionalRates {
    #[serde(default)]
    pub long: f64,
    #[serde(default)]
    pub short: f64,
}

impl DirectionalRates {
    pub fn new(long: f64, short: f64) -> Self {
        Self { long, short }
    }

    pub fn for_direction(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Long => self.long,
            Direction::Short => self.short,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancingConfig {
    pub rollover_hour_utc: u32,
    pub rollover_minute_utc: u32,
    /// Rollover that books the weekend; charged `triple_multiplier` days.
    pub triple_rollover_weekday: Weekday,
    pub triple_multiplier: u32,
    pub model: FinancingModel,
    /// Symbol → daily rates.
    pub rates: BTreeMap<String, DirectionalRates>,
}

impl Default for FinancingConfig {
    fn default() -> Self {
        Self {
            rollover_hour_utc: 22,
            rollover_minute_utc: 0,
            triple_rollover_weekday: Weekday::Wed,
            triple_multiplier: 3,
            model: FinancingModel::UsdPerLotDay,
            rates: BTreeMap::new(),
        }
    }
}

impl FinancingConfig {
    pub fn with_rates(mut self, symbol: &str, rates: DirectionalRates) -> Self {
        self.rates.insert(symbol.to_string(), rates);
        self
    }

    pub fn with_model(mut self, model: FinancingModel) -> Self {
        self.model = model;
        self
    }

    fn rate(&self, symbol: &str, direction: Direction) -> f64 {
        self.rates
            .get(symbol)
            .map(|r| r.for_direction(direction))
            .filter(|r| r.is_finite())
            .unwrap_or(0.0)
    }

    /// Financing for one closed trade. Anything unconfigured charges nothing.
    pub fn charge(&self, trade: &RawTrade, ctx: &InstrumentContext) -> FinancingCharge {
        let rate = self.rate(&trade.symbol, trade.direction);
        if rate == 0.0 {
            return FinancingCharge::default();
        }

        let rollovers = rollover_times(
            trade.entry_time,
            trade.exit_time,
            self.rollover_hour_utc,
            self.rollover_minute_utc,
        );

        let mut charge = FinancingCharge::default();
        for at in rollovers {
            let lots = lots_open_at(trade, at);
            let one_day = match self.model {
                FinancingModel::UsdPerLotDay => lots * rate,
                FinancingModel::NotionalRate => {
                    trade.entry_price * lots * ctx.contract_size * rate
                }
            };
            let days = if at.weekday() == self.triple_rollover_weekday {
                self.triple_multiplier.max(1)
            } else {
                1
            };

            charge.rollovers += 1;
            charge.days += days;
            charge.overnight += one_day;
            charge.weekend += one_day * f64::from(days - 1);
        }
        charge.total = charge.overnight + charge.weekend;
        charge
    }
}

/// Financing booked on one trade.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FinancingCharge {
    pub rollovers: u32,
    pub days: u32,
    pub overnight: f64,
    pub weekend: f64,
    pub total: f64,
}

/// Lots still open at a rollover: the remainder once TP1 has filled.
fn lots_open_at(trade: &RawTrade, at: DateTime<Utc>) -> f64 {
    match trade.tp1_time {
        Some(tp1_time) if tp1_time <= at => trade.position_size,
        _ => trade.initial_position_size,
    }
}

/// Daily rollover instants in `(entry, exit]`, at `hour:minute` UTC.
///
/// Empty when `exit <= entry` or the hour/minute is not a valid time of day.
pub fn rollover_times(
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
    hour: u32,
    minute: u32,
) -> Vec<DateTime<Utc>> {
    if exit <= entry {
        return Vec::new();
    }
    let Some(anchor) = entry.date_naive().and_hms_opt(hour, minute, 0) else {
        return Vec::new();
    };

    let mut at = Utc.from_utc_datetime(&anchor);
    if at <= entry {
        at = at + Duration::days(1);
    }

    let mut out = Vec::new();
    while at <= exit {
        out.push(at);
        at = at + Duration::days(1);
    }
    out
}
