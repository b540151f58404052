//! Instrument metadata and the per-symbol pricing context derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Quoted spread, either in pips (scaled by point size) or absolute price units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spread {
    Pips(f64),
    Points(f64),
}

impl Spread {
    /// Spread in absolute price units.
    pub fn to_abs(self, point_size: f64) -> f64 {
        match self {
            Spread::Pips(pips) => pips * point_size,
            Spread::Points(points) => points,
        }
    }
}

/// Static metadata for one symbol, as found in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub point_size: f64,
    pub pip_value: f64,
    #[serde(default = "default_contract_size")]
    pub contract_size: f64,
    #[serde(default)]
    pub spread: Option<Spread>,
    /// Per-symbol slippage override, in pips.
    #[serde(default)]
    pub slippage_pips: Option<f64>,
}

fn default_contract_size() -> f64 {
    1.0
}

impl InstrumentSpec {
    pub fn new(point_size: f64, pip_value: f64) -> Self {
        Self {
            point_size,
            pip_value,
            contract_size: default_contract_size(),
            spread: None,
            slippage_pips: None,
        }
    }

    pub fn with_spread(mut self, spread: Spread) -> Self {
        self.spread = Some(spread);
        self
    }

    pub fn with_contract_size(mut self, contract_size: f64) -> Self {
        self.contract_size = contract_size;
        self
    }

    pub fn with_slippage_pips(mut self, pips: f64) -> Self {
        self.slippage_pips = Some(pips);
        self
    }
}

/// Pricing conventions for one symbol, computed once and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentContext {
    pub symbol: String,
    pub point_size: f64,
    pub pip_value: f64,
    pub contract_size: f64,
    pub spread_abs: f64,
    pub half_spread: f64,
    pub slippage_abs: f64,
}

impl InstrumentContext {
    /// Convert an absolute price distance held over `lots` into account currency.
    ///
    /// `usd = abs_price / point_size * pip_value * lots`
    pub fn price_to_usd(&self, abs_price: f64, lots: f64) -> f64 {
        if lots <= 0.0 {
            return 0.0;
        }
        abs_price / self.point_size * self.pip_value * lots
    }
}

/// Symbol → metadata lookup. Builds `InstrumentContext`s on demand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentCatalog {
    instruments: BTreeMap<String, InstrumentSpec>,
    /// Slippage in pips for symbols without their own override.
    #[serde(default)]
    default_slippage_pips: f64,
}

impl InstrumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the platform's standard instruments.
    pub fn builtin() -> Self {
        Self::new()
            .with_instrument(
                "EURUSD",
                InstrumentSpec::new(0.0001, 10.0).with_spread(Spread::Pips(1.0)),
            )
            .with_instrument(
                "XAUUSD",
                InstrumentSpec::new(0.01, 1.0).with_spread(Spread::Points(0.10)),
            )
            .with_instrument(
                "USTECH100",
                InstrumentSpec::new(0.01, 1.0).with_spread(Spread::Points(1.0)),
            )
    }

    pub fn with_instrument(mut self, symbol: &str, spec: InstrumentSpec) -> Self {
        self.insert(symbol, spec);
        self
    }

    pub fn with_default_slippage_pips(mut self, pips: f64) -> Self {
        self.default_slippage_pips = pips;
        self
    }

    pub fn insert(&mut self, symbol: &str, spec: InstrumentSpec) {
        self.instruments.insert(symbol.to_string(), spec);
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentSpec> {
        self.instruments.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Build the pricing context for `symbol`.
    ///
    /// A symbol without metadata is fatal: nothing can be priced without it.
    pub fn context(&self, symbol: &str) -> Result<InstrumentContext, InstrumentError> {
        let spec = self
            .get(symbol)
            .ok_or_else(|| InstrumentError::MissingInstrumentMeta {
                symbol: symbol.to_string(),
            })?;

        let invalid = |reason: &str| InstrumentError::InvalidInstrument {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };

        if !(spec.point_size.is_finite() && spec.point_size > 0.0) {
            return Err(invalid("point_size must be positive"));
        }
        if !(spec.pip_value.is_finite() && spec.pip_value >= 0.0) {
            return Err(invalid("pip_value must be non-negative"));
        }
        if !(spec.contract_size.is_finite() && spec.contract_size >= 0.0) {
            return Err(invalid("contract_size must be non-negative"));
        }

        let spread_abs = spec
            .spread
            .map(|s| s.to_abs(spec.point_size))
            .unwrap_or(0.0);
        if !(spread_abs.is_finite() && spread_abs >= 0.0) {
            return Err(invalid("spread must be non-negative"));
        }

        let slippage_pips = spec.slippage_pips.unwrap_or(self.default_slippage_pips);
        let slippage_abs = slippage_pips * spec.point_size;
        if !(slippage_abs.is_finite() && slippage_abs >= 0.0) {
            return Err(invalid("slippage must be non-negative"));
        }

        Ok(InstrumentContext {
            symbol: symbol.to_string(),
            point_size: spec.point_size,
            pip_value: spec.pip_value,
            contract_size: spec.contract_size,
            spread_abs,
            half_spread: spread_abs / 2.0,
            slippage_abs,
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InstrumentError {
    #[error("no instrument metadata for symbol '{symbol}'")]
    MissingInstrumentMeta { symbol: String },

    #[error("invalid instrument metadata for '{symbol}': {reason}")]
    InvalidInstrument { symbol: String, reason: String },
}
