//! Closing an open position with an opposite-side, reduce-only market order.

use rust_decimal::Decimal;

use crate::error::{TesterError, TesterResult};
use crate::models::{OrderRequest, OrderSide, Position};

use super::precision::LotSize;
use super::sizing::format_quantity;

/// The order that flattens a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOrder {
    pub symbol: String,
    pub side: OrderSide,
    /// Position size rounded down to the lot size
    pub quantity: Decimal,
    pub precision: u32,
}

impl CloseOrder {
    pub fn to_wire(&self) -> String {
        format_quantity(self.quantity, self.precision)
    }

    /// Reduce-only: the order can shrink the position but never flip it.
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest::reduce_only(self.symbol.clone(), self.side, self.to_wire())
    }
}

/// Long positions close with a SELL, shorts with a BUY, for the full size
/// rounded down to the lot size.
pub fn resolve_close(position: &Position, lot: LotSize) -> TesterResult<CloseOrder> {
    let direction = position.direction().ok_or_else(|| {
        TesterError::validation(format!("no active position for {}", position.symbol))
    })?;

    let quantity = lot
        .floor(position.size())
        .filter(|q| !q.is_zero())
        .ok_or_else(|| {
            TesterError::validation(format!(
                "position size {} in {} is below the lot size",
                position.size(),
                position.symbol
            ))
        })?;

    Ok(CloseOrder {
        symbol: position.symbol.clone(),
        side: direction.opening_side().opposite(),
        quantity,
        precision: lot.precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_close_short() {
        let position = Position::new("BTCUSDT", dec!(-2.5), dec!(50000));
        let close = resolve_close(&position, LotSize::decimals(3)).unwrap();

        assert_eq!(close.side, OrderSide::Buy);
        assert_eq!(close.to_wire(), "2.500");

        let request = close.to_request();
        assert!(request.reduce_only);
        assert_eq!(request.quantity, "2.500");
        assert_eq!(request.side, OrderSide::Buy);
    }

    #[test]
    fn test_close_long() {
        let position = Position::new("DOGEUSDT", dec!(667), dec!(0.15));
        let close = resolve_close(&position, LotSize::decimals(0)).unwrap();

        assert_eq!(close.side, OrderSide::Sell);
        assert_eq!(close.to_wire(), "667");
    }

    #[test]
    fn test_flat_position_rejected() {
        let position = Position::new("ETHUSDT", Decimal::ZERO, dec!(3000));
        let err = resolve_close(&position, LotSize::decimals(3)).unwrap_err();
        assert!(matches!(err, TesterError::Validation(_)));
    }

    #[test]
    fn test_close_never_exceeds_position() {
        let position = Position::new("BTCUSDT", dec!(-0.0019), dec!(50000));
        let close = resolve_close(&position, LotSize::decimals(3)).unwrap();
        assert_eq!(close.to_wire(), "0.001");
        assert_eq!(close.side, OrderSide::Buy);

        let position = Position::new("DOGEUSDT", dec!(667), dec!(0.15));
        let close = resolve_close(&position, LotSize::from_step(dec!(5))).unwrap();
        assert_eq!(close.to_wire(), "665");
    }

    #[test]
    fn test_dust_position_rejected() {
        let position = Position::new("BTCUSDT", dec!(0.0004), dec!(50000));
        let err = resolve_close(&position, LotSize::decimals(3)).unwrap_err();
        assert!(matches!(err, TesterError::Validation(_)));
    }

    #[test]
    fn test_side_opposes_sign_and_size_matches() {
        let quantities = [
            dec!(0.001),
            dec!(-0.001),
            dec!(1),
            dec!(-1),
            dec!(12.34),
            dec!(-12.34),
            dec!(-1000000),
        ];

        for q in quantities {
            let position = Position::new("BTCUSDT", q, dec!(100));
            let close = resolve_close(&position, LotSize::decimals(3)).unwrap();

            let expected = if q > Decimal::ZERO {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            assert_eq!(close.side, expected, "{q}");
            assert_eq!(close.quantity, q.abs());
        }
    }
}
