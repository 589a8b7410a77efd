//! Position model: an open futures position where the sign of the quantity
//! is the direction.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::api::PositionRiskEntry;

use super::order::OrderSide;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side of the order that opens a position in this direction.
    pub fn opening_side(self) -> OrderSide {
        match self {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("LONG"),
            Direction::Short => f.write_str("SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" | "l" | "buy" => Ok(Direction::Long),
            "short" | "s" | "sell" => Ok(Direction::Short),
            other => Err(format!("unknown direction '{other}', expected long or short")),
        }
    }
}

/// Open position as reported by position risk.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,

    /// Positive = long, negative = short
    pub signed_quantity: Decimal,

    pub entry_price: Decimal,

    pub mark_price: Decimal,

    pub unrealized_pnl: Decimal,

    pub liquidation_price: Decimal,

    pub leverage: u32,

    /// BOTH in one-way mode, LONG/SHORT in hedge mode
    pub position_side: String,
}

impl Position {
    #[cfg(test)]
    pub fn new(symbol: impl Into<String>, signed_quantity: Decimal, entry_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            signed_quantity,
            entry_price,
            mark_price: entry_price,
            unrealized_pnl: Decimal::ZERO,
            liquidation_price: Decimal::ZERO,
            leverage: 1,
            position_side: "BOTH".to_string(),
        }
    }

    /// Build from a position risk row. Flat rows yield `None`.
    pub fn from_risk(entry: PositionRiskEntry) -> Option<Self> {
        if entry.position_amt.is_zero() {
            return None;
        }
        Some(Self {
            symbol: entry.symbol,
            signed_quantity: entry.position_amt,
            entry_price: entry.entry_price,
            mark_price: entry.mark_price,
            unrealized_pnl: entry.un_realized_profit,
            liquidation_price: entry.liquidation_price,
            leverage: entry.leverage.max(1),
            position_side: entry.position_side,
        })
    }

    /// `None` for a flat position.
    pub fn direction(&self) -> Option<Direction> {
        if self.signed_quantity > Decimal::ZERO {
            Some(Direction::Long)
        } else if self.signed_quantity < Decimal::ZERO {
            Some(Direction::Short)
        } else {
            None
        }
    }

    pub fn size(&self) -> Decimal {
        self.signed_quantity.abs()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = self
            .direction()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "FLAT".to_string());
        writeln!(f, "  {} ({})", self.symbol, direction)?;
        writeln!(f, "    Quantity:     {}", self.signed_quantity)?;
        writeln!(f, "    Entry Price:  ${:.2}", self.entry_price)?;
        writeln!(f, "    Mark Price:   ${:.2}", self.mark_price)?;
        writeln!(f, "    Unrealized:   ${:.4}", self.unrealized_pnl)?;
        writeln!(f, "    Liquidation:  ${:.2}", self.liquidation_price)?;
        write!(f, "    Leverage:     {}x", self.leverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn risk(amt: Decimal) -> PositionRiskEntry {
        PositionRiskEntry {
            symbol: "ETHUSDT".to_string(),
            position_amt: amt,
            entry_price: dec!(3000),
            mark_price: dec!(3100),
            un_realized_profit: dec!(10),
            liquidation_price: dec!(0),
            leverage: 0,
            position_side: "BOTH".to_string(),
        }
    }

    #[test]
    fn test_flat_rows_are_filtered() {
        assert!(Position::from_risk(risk(Decimal::ZERO)).is_none());
        assert!(Position::from_risk(risk(dec!(0.000))).is_none());
    }

    #[test]
    fn test_direction_from_sign() {
        let long = Position::from_risk(risk(dec!(0.1))).unwrap();
        assert_eq!(long.direction(), Some(Direction::Long));
        assert_eq!(long.leverage, 1);

        let short = Position::from_risk(risk(dec!(-0.1))).unwrap();
        assert_eq!(short.direction(), Some(Direction::Short));
        assert_eq!(short.size(), dec!(0.1));
    }

    #[test]
    fn test_opening_side() {
        assert_eq!(Direction::Long.opening_side(), OrderSide::Buy);
        assert_eq!(Direction::Short.opening_side().opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!("long".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!(" S ".parse::<Direction>().unwrap(), Direction::Short);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_flat_position_has_no_direction() {
        let flat = Position::new("BTCUSDT", Decimal::ZERO, dec!(50000));
        assert_eq!(flat.direction(), None);
    }
}
