//! TradePlan: one candidate trade per candle index, produced by the feature pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Multiplies a price move into signed P&L.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// Parse the pipeline's direction label. Anything else is unknown.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the plan's exits are specified.
///
/// `Fixed` plans carry both take-profit levels. `Managed` plans may omit them;
/// only the stop is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitMode {
    #[default]
    Fixed,
    Managed,
}

/// One row of the plan table, aligned with the candle at the same index.
///
/// Most rows are not actionable; plans are expected to be sparse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradePlan {
    pub valid: bool,
    pub direction: Option<Direction>,
    pub entry_tag: String,
    pub sl: Option<f64>,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub sl_tag: String,
    pub tp1_tag: String,
    pub tp2_tag: String,
    pub exit_mode: ExitMode,
}

/// Validated price levels of an actionable plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLevels {
    pub direction: Direction,
    pub sl: f64,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
}

impl TradePlan {
    /// A row with no plan on it.
    pub fn none() -> Self {
        Self::default()
    }

    /// A fixed-mode long plan with default level labels.
    pub fn long(entry_tag: &str, sl: f64, tp1: f64, tp2: f64) -> Self {
        Self::fixed(Direction::Long, entry_tag, sl, tp1, tp2)
    }

    /// A fixed-mode short plan with default level labels.
    pub fn short(entry_tag: &str, sl: f64, tp1: f64, tp2: f64) -> Self {
        Self::fixed(Direction::Short, entry_tag, sl, tp1, tp2)
    }

    fn fixed(direction: Direction, entry_tag: &str, sl: f64, tp1: f64, tp2: f64) -> Self {
        Self {
            valid: true,
            direction: Some(direction),
            entry_tag: entry_tag.to_string(),
            sl: Some(sl),
            tp1: Some(tp1),
            tp2: Some(tp2),
            sl_tag: "SL".into(),
            tp1_tag: "TP1".into(),
            tp2_tag: "TP2".into(),
            exit_mode: ExitMode::Fixed,
        }
    }

    /// Switch to managed exits, where take-profits are optional.
    pub fn managed(mut self) -> Self {
        self.exit_mode = ExitMode::Managed;
        self
    }

    /// Levels of this plan if it is actionable, `None` otherwise.
    ///
    /// Actionable means: flagged valid, direction known, finite stop, and for
    /// `Fixed` mode finite TP1 and TP2. A non-finite take-profit on a managed
    /// plan is treated as absent.
    pub fn actionable(&self) -> Option<PlanLevels> {
        if !self.valid {
            return None;
        }
        let direction = self.direction?;
        let sl = finite(self.sl)?;
        let tp1 = finite(self.tp1);
        let tp2 = finite(self.tp2);

        if self.exit_mode == ExitMode::Fixed && (tp1.is_none() || tp2.is_none()) {
            return None;
        }

        Some(PlanLevels {
            direction,
            sl,
            tp1,
            tp2,
        })
    }
}

fn finite(level: Option<f64>) -> Option<f64> {
    level.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_long_plan_is_actionable() {
        let levels = TradePlan::long("breakout", 99.0, 101.0, 102.0)
            .actionable()
            .unwrap();
        assert_eq!(levels.direction, Direction::Long);
        assert_eq!(levels.sl, 99.0);
        assert_eq!(levels.tp1, Some(101.0));
        assert_eq!(levels.tp2, Some(102.0));
    }

    #[test]
    fn invalid_flag_is_not_actionable() {
        let mut plan = TradePlan::long("a", 99.0, 101.0, 102.0);
        plan.valid = false;
        assert!(plan.actionable().is_none());
    }

    #[test]
    fn unknown_direction_is_not_actionable() {
        let mut plan = TradePlan::long("a", 99.0, 101.0, 102.0);
        plan.direction = None;
        assert!(plan.actionable().is_none());
    }

    #[test]
    fn non_finite_stop_is_not_actionable() {
        let mut plan = TradePlan::short("a", f64::NAN, 99.0, 98.0);
        assert!(plan.actionable().is_none());
        plan.sl = None;
        assert!(plan.actionable().is_none());
    }

    #[test]
    fn fixed_mode_requires_both_targets() {
        let mut plan = TradePlan::long("a", 99.0, 101.0, 102.0);
        plan.tp2 = Some(f64::INFINITY);
        assert!(plan.actionable().is_none());
    }

    #[test]
    fn managed_mode_allows_missing_targets() {
        let mut plan = TradePlan::long("a", 99.0, 101.0, 102.0).managed();
        plan.tp1 = None;
        plan.tp2 = Some(f64::NAN);
        let levels = plan.actionable().unwrap();
        assert_eq!(levels.tp1, None);
        assert_eq!(levels.tp2, None);
    }

    #[test]
    fn empty_row_is_not_actionable() {
        assert!(TradePlan::none().actionable().is_none());
    }

    #[test]
    fn direction_parse_is_lenient_on_case() {
        assert_eq!(Direction::parse("Long"), Some(Direction::Long));
        assert_eq!(Direction::parse(" short "), Some(Direction::Short));
        assert_eq!(Direction::parse(""), None);
        assert_eq!(Direction::parse("flat"), None);
    }
}
