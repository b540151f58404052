//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC candle for a single symbol.
///
/// Produced externally by the data layer. The engine only reads candles;
/// a series is expected to be strictly increasing in `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Basic OHLC sanity check: all fields finite, high >= low and both
    /// bracket open/close.
    pub fn is_sane(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CandleError {
    #[error("candle time is not strictly increasing at index {index}")]
    NonIncreasingTime { index: usize },

    #[error("candle {index} has non-finite or inconsistent OHLC")]
    InsaneBar { index: usize },
}

/// Check that every candle passes [`Candle::is_sane`] and that times are
/// strictly increasing (and therefore unique). Errors report the first
/// offending index.
pub fn validate_series(candles: &[Candle]) -> Result<(), CandleError> {
    for (index, candle) in candles.iter().enumerate() {
        if !candle.is_sane() {
            return Err(CandleError::InsaneBar { index });
        }
        if index > 0 && candle.time <= candles[index - 1].time {
            return Err(CandleError::NonIncreasingTime { index });
        }
    }
    Ok(())
}
