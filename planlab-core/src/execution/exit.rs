//! Exit simulator: the per-trade state machine.
//!
//! Phases: `Open` → `Tp1Partial` → `Closed(SL | BE | TP2 | TIMEOUT)`.
//!
//! Within one bar the checks run in a fixed order:
//! 1. TP1 touch: book half the size at the TP1 level, move the stop to entry.
//! 2. Stop breach (original or breakeven): close at the stop level.
//! 3. TP2 touch: close the remainder at the TP2 level.
//!
//! A single bar can therefore fill TP1 and stop out at breakeven. Stops fill
//! at their level even when the bar opens through them.
//!
//! `TradeState` is a value: `on_bar` consumes it and returns the next state.

use crate::domain::{Candle, Direction, ExitReason, PlanLevels};
use chrono::{DateTime, Utc};

/// Where the trade is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Open,
    Tp1Partial,
    Closed(ExitFill),
}

/// The TP1 partial close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tp1Fill {
    pub index: usize,
    pub time: DateTime<Utc>,
    pub price: f64,
}

/// The fill that closed the trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub index: usize,
    pub time: DateTime<Utc>,
    pub price: f64,
    pub reason: ExitReason,
}

/// One open trade, advanced bar by bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeState<'a> {
    pub direction: Direction,
    pub entry_tag: &'a str,
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    /// Current stop. Moves to `entry_price` once TP1 fills.
    pub sl: f64,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub initial_size: f64,
    pub position_size: f64,
    pub tp1_fill: Option<Tp1Fill>,
    pub phase: Phase,
}

impl<'a> TradeState<'a> {
    /// Open a trade at the close of the entry bar.
    pub fn open(
        entry_tag: &'a str,
        entry_index: usize,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        levels: &PlanLevels,
        size: f64,
    ) -> Self {
        Self {
            direction: levels.direction,
            entry_tag,
            entry_index,
            entry_time,
            entry_price,
            sl: levels.sl,
            tp1: levels.tp1,
            tp2: levels.tp2,
            initial_size: size,
            position_size: size,
            tp1_fill: None,
            phase: Phase::Open,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed(_))
    }

    pub fn exit(&self) -> Option<ExitFill> {
        match self.phase {
            Phase::Closed(fill) => Some(fill),
            _ => None,
        }
    }

    /// Advance by one bar. A closed trade is returned unchanged.
    pub fn on_bar(self, index: usize, bar: &Candle) -> Self {
        if self.is_closed() {
            return self;
        }
        let mut next = self;

        // 1. TP1
        if next.phase == Phase::Open {
            if let Some(tp1) = next.tp1 {
                if touches_target(next.direction, tp1, bar) {
                    next.tp1_fill = Some(Tp1Fill {
                        index,
                        time: bar.time,
                        price: tp1,
                    });
                    next.position_size = next.initial_size / 2.0;
                    next.sl = next.entry_price;
                    next.phase = Phase::Tp1Partial;
                }
            }
        }

        // 2. SL / BE
        if breaches_stop(next.direction, next.sl, bar) {
            let reason = if next.phase == Phase::Tp1Partial {
                ExitReason::BE
            } else {
                ExitReason::SL
            };
            next.phase = Phase::Closed(ExitFill {
                index,
                time: bar.time,
                price: next.sl,
                reason,
            });
            return next;
        }

        // 3. TP2
        if let Some(tp2) = next.tp2 {
            if touches_target(next.direction, tp2, bar) {
                next.phase = Phase::Closed(ExitFill {
                    index,
                    time: bar.time,
                    price: tp2,
                    reason: ExitReason::TP2,
                });
            }
        }

        next
    }

    /// Close at `bar`'s close because the data ran out.
    pub fn timeout(self, index: usize, bar: &Candle) -> Self {
        if self.is_closed() {
            return self;
        }
        Self {
            phase: Phase::Closed(ExitFill {
                index,
                time: bar.time,
                price: bar.close,
                reason: ExitReason::TIMEOUT,
            }),
            ..self
        }
    }
}

fn touches_target(direction: Direction, level: f64, bar: &Candle) -> bool {
    match direction {
        Direction::Long => bar.high >= level,
        Direction::Short => bar.low <= level,
    }
}

fn breaches_stop(direction: Direction, level: f64, bar: &Candle) -> bool {
    match direction {
        Direction::Long => bar.low <= level,
        Direction::Short => bar.high >= level,
    }
}

/// Resolved exit of one trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitOutcome {
    pub tp1: Option<Tp1Fill>,
    pub exit: ExitFill,
    /// Size still open when the trade closed.
    pub position_size: f64,
    /// Stop in force when the trade closed.
    pub stop_at_exit: f64,
}

/// Run a freshly opened trade forward over `candles` until it closes.
///
/// Only bars after `state.entry_index` are read. If none of them closes the
/// trade it times out on the last bar, which is the entry bar itself when the
/// entry is on the final candle. Returns `None` if the entry index is outside
/// the series.
pub fn simulate_exit(state: TradeState<'_>, candles: &[Candle]) -> Option<ExitOutcome> {
    let last_index = candles.len().checked_sub(1)?;
    if state.entry_index > last_index {
        return None;
    }

    let mut current = state;
    for (index, bar) in candles.iter().enumerate().skip(state.entry_index + 1) {
        current = current.on_bar(index, bar);
        if current.is_closed() {
            break;
        }
    }
    let current = current.timeout(last_index, &candles[last_index]);

    let exit = current.exit()?;
    Some(ExitOutcome {
        tp1: current.tp1_fill,
        exit,
        position_size: current.position_size,
        stop_at_exit: current.sl,
    })
}
