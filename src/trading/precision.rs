//! Per-instrument quantity precision and minimum order value.
//!
//! Exchange metadata is authoritative. The static table only covers the
//! symbols offered in the menu and is used when metadata could not be loaded.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::api::{ExchangeInfo, SymbolFilter, SymbolInfo};

/// Precision used for symbols nobody knows anything about.
pub const DEFAULT_PRECISION: u32 = 3;

/// Fallback lot-size precision for the menu symbols.
const STATIC_PRECISION: &[(&str, u32)] = &[
    ("BTCUSDT", 3),
    ("ETHUSDT", 3),
    ("SOLUSDT", 1),
    ("DOGEUSDT", 0),
    ("ADAUSDT", 0),
    ("LINKUSDT", 2),
];

/// Symbols offered by the custom order menu.
pub fn menu_symbols() -> impl Iterator<Item = &'static str> {
    STATIC_PRECISION.iter().map(|(s, _)| *s)
}

/// Where a precision value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Override,
    Exchange,
    Static,
    Default,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuleSource::Override => "config override",
            RuleSource::Exchange => "exchange metadata",
            RuleSource::Static => "static table",
            RuleSource::Default => "default",
        };
        f.write_str(s)
    }
}

/// Quantity increments accepted for one symbol.
///
/// With a step size every quantity is a whole multiple of it. Without one,
/// quantities are rounded to `precision` decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotSize {
    pub precision: u32,
    pub step: Option<Decimal>,
}

impl LotSize {
    pub fn decimals(precision: u32) -> Self {
        Self {
            precision,
            step: None,
        }
    }

    pub fn from_step(step: Decimal) -> Self {
        let step = step.normalize();
        Self {
            precision: step.scale(),
            step: Some(step),
        }
    }

    /// Smallest valid quantity not below `value`. `None` on overflow.
    pub fn ceil(&self, value: Decimal) -> Option<Decimal> {
        match self.step {
            Some(step) => value.checked_div(step)?.ceil().checked_mul(step),
            None => Some(value.round_dp_with_strategy(self.precision, RoundingStrategy::ToPositiveInfinity)),
        }
    }

    /// Largest valid quantity not above `value`. `None` on overflow.
    pub fn floor(&self, value: Decimal) -> Option<Decimal> {
        match self.step {
            Some(step) => value.checked_div(step)?.floor().checked_mul(step),
            None => Some(value.round_dp_with_strategy(self.precision, RoundingStrategy::ToNegativeInfinity)),
        }
    }
}

/// Resolved trading rules for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRules {
    pub symbol: String,
    pub precision: u32,
    /// Exchange step size, when metadata provided one
    pub step_size: Option<Decimal>,
    pub min_notional: Decimal,
    pub source: RuleSource,
}

impl InstrumentRules {
    pub fn lot_size(&self) -> LotSize {
        LotSize {
            precision: self.precision,
            step: self.step_size,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ExchangeRules {
    lot: LotSize,
    min_notional: Option<Decimal>,
}

/// Lookup table of instrument rules.
#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    exchange: HashMap<String, ExchangeRules>,
    overrides: HashMap<String, u32>,
    default_min_notional: Decimal,
}

impl InstrumentRegistry {
    /// Registry backed only by overrides and the static table.
    pub fn new(overrides: HashMap<String, u32>, default_min_notional: Decimal) -> Self {
        Self {
            exchange: HashMap::new(),
            overrides,
            default_min_notional,
        }
    }

    /// Merge symbol rules from exchange metadata. Returns how many symbols
    /// were usable.
    pub fn load_exchange_info(&mut self, info: &ExchangeInfo) -> usize {
        let mut loaded = 0;
        for symbol in &info.symbols {
            if let Some(rules) = rules_from_symbol(symbol) {
                self.exchange.insert(symbol.symbol.clone(), rules);
                loaded += 1;
            } else {
                debug!(symbol = %symbol.symbol, "No lot size information");
            }
        }
        loaded
    }

    pub fn rules(&self, symbol: &str) -> InstrumentRules {
        let exchange = self.exchange.get(symbol);

        // Never go below either the exchange minimum or the configured one.
        let min_notional = exchange
            .and_then(|r| r.min_notional)
            .map(|n| n.max(self.default_min_notional))
            .unwrap_or(self.default_min_notional);

        let (lot, source) = if let Some(p) = self.overrides.get(symbol) {
            (LotSize::decimals(*p), RuleSource::Override)
        } else if let Some(r) = exchange {
            (r.lot, RuleSource::Exchange)
        } else if let Some(p) = static_precision(symbol) {
            (LotSize::decimals(p), RuleSource::Static)
        } else {
            (LotSize::decimals(DEFAULT_PRECISION), RuleSource::Default)
        };

        InstrumentRules {
            symbol: symbol.to_string(),
            precision: lot.precision,
            step_size: lot.step,
            min_notional,
            source,
        }
    }

    pub fn lot_size(&self, symbol: &str) -> LotSize {
        self.rules(symbol).lot_size()
    }
}

fn static_precision(symbol: &str) -> Option<u32> {
    STATIC_PRECISION
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, p)| *p)
}

fn rules_from_symbol(symbol: &SymbolInfo) -> Option<ExchangeRules> {
    let mut lot_step = None;
    let mut market_step = None;
    let mut min_notional = None;

    for filter in &symbol.filters {
        match filter {
            SymbolFilter::LotSize { step_size, .. } => lot_step = Some(*step_size),
            SymbolFilter::MarketLotSize { step_size, .. } => market_step = Some(*step_size),
            SymbolFilter::MinNotional { notional } => min_notional = Some(*notional),
            SymbolFilter::Other => {}
        }
    }

    let lot = lot_step
        .or(market_step)
        .filter(|s| *s > Decimal::ZERO)
        .map(LotSize::from_step)
        .or_else(|| symbol.quantity_precision.map(LotSize::decimals))?;

    Some(ExchangeRules { lot, min_notional })
}
