//! Order sizing: target notional, price and leverage to an exchange-valid
//! quantity.
//!
//! Quantities are always rounded UP to the instrument precision so the order
//! value never drops under the exchange's minimum because of truncation. When
//! the requested value is too small anyway, the minimum notional wins.

use rust_decimal::Decimal;

use crate::error::{TesterError, TesterResult};

use super::precision::{InstrumentRegistry, LotSize};

/// A quantity sized for a specific instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedQuantity {
    pub quantity: Decimal,
    pub precision: u32,
    /// The requested value was below the minimum and the size was raised
    pub floor_applied: bool,
}

impl SizedQuantity {
    /// Fixed-decimal string with exactly `precision` digits.
    pub fn to_wire(&self) -> String {
        format_quantity(self.quantity, self.precision)
    }

    pub fn notional(&self, price: Decimal) -> Decimal {
        self.quantity.checked_mul(price).unwrap_or(Decimal::MAX)
    }
}

/// Size an order.
///
/// `raw = notional_usd * leverage / current_price`, rounded up to the lot
/// size. If that is worth less than `min_notional_usd`, the quantity becomes
/// `min_notional_usd / current_price` rounded up instead. Values outside the
/// decimal range are a validation error.
pub fn size_order(
    notional_usd: Decimal,
    current_price: Decimal,
    leverage: u32,
    min_notional_usd: Decimal,
    lot: LotSize,
) -> TesterResult<SizedQuantity> {
    if current_price <= Decimal::ZERO {
        return Err(TesterError::validation(format!(
            "price must be positive, got {current_price}"
        )));
    }
    if leverage < 1 {
        return Err(TesterError::validation("leverage must be at least 1"));
    }
    if notional_usd <= Decimal::ZERO {
        return Err(TesterError::validation(format!(
            "order value must be positive, got {notional_usd}"
        )));
    }
    if min_notional_usd < Decimal::ZERO {
        return Err(TesterError::validation("minimum order value cannot be negative"));
    }

    let quantity = notional_usd
        .checked_mul(Decimal::from(leverage))
        .and_then(|v| v.checked_div(current_price))
        .and_then(|raw| lot.ceil(raw))
        .ok_or_else(too_large)?;
    let value = quantity.checked_mul(current_price).ok_or_else(too_large)?;

    if value < min_notional_usd {
        let quantity = min_notional_usd
            .checked_div(current_price)
            .and_then(|raw| lot.ceil(raw))
            .ok_or_else(too_large)?;
        return Ok(SizedQuantity {
            quantity,
            precision: lot.precision,
            floor_applied: true,
        });
    }

    Ok(SizedQuantity {
        quantity,
        precision: lot.precision,
        floor_applied: false,
    })
}

fn too_large() -> TesterError {
    TesterError::validation("order value too large")
}

/// Render `quantity` with exactly `precision` decimal places, no exponent.
pub fn format_quantity(quantity: Decimal, precision: u32) -> String {
    let mut q = quantity;
    q.rescale(precision);
    q.to_string()
}

/// Sizes orders using the registry's per-symbol lot size.
pub struct OrderSizer<'a> {
    registry: &'a InstrumentRegistry,
}

impl<'a> OrderSizer<'a> {
    pub fn new(registry: &'a InstrumentRegistry) -> Self {
        Self { registry }
    }

    pub fn compute_order_quantity(
        &self,
        symbol: &str,
        notional_usd: Decimal,
        current_price: Decimal,
        leverage: u32,
        min_notional_usd: Decimal,
    ) -> TesterResult<SizedQuantity> {
        let lot = self.registry.lot_size(symbol);
        size_order(notional_usd, current_price, leverage, min_notional_usd, lot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_btc_exact_minimum() {
        let sized = size_order(dec!(100), dec!(50000), 1, dec!(100), LotSize::decimals(3)).unwrap();
        assert_eq!(sized.to_wire(), "0.002");
        assert!(!sized.floor_applied);
        assert_eq!(sized.notional(dec!(50000)), dec!(100));
    }

    #[test]
    fn test_doge_whole_units() {
        let sized = size_order(dec!(100), dec!(0.15), 1, dec!(100), LotSize::decimals(0)).unwrap();
        assert_eq!(sized.to_wire(), "667");
        assert_eq!(sized.notional(dec!(0.15)), dec!(100.05));
        assert!(!sized.floor_applied);
    }

    #[test]
    fn test_leverage_scales_quantity() {
        let sized = size_order(dec!(100), dec!(50000), 5, dec!(100), LotSize::decimals(3)).unwrap();
        assert_eq!(sized.to_wire(), "0.010");
    }

    #[test]
    fn test_floor_applied_for_small_orders() {
        let sized = size_order(dec!(20), dec!(3000), 1, dec!(100), LotSize::decimals(3)).unwrap();
        assert!(sized.floor_applied);
        // 100 / 3000 = 0.0333.. -> 0.034
        assert_eq!(sized.to_wire(), "0.034");
        assert!(sized.notional(dec!(3000)) >= dec!(100));
    }

    #[test]
    fn test_rounds_up_never_down() {
        // 100 / 30000 = 0.003333.. -> 0.004
        let sized = size_order(dec!(100), dec!(30000), 1, Decimal::ZERO, LotSize::decimals(3)).unwrap();
        assert_eq!(sized.quantity, dec!(0.004));
    }

    #[test]
    fn test_wire_format_pads_and_never_uses_exponent() {
        assert_eq!(format_quantity(dec!(2.5), 3), "2.500");
        assert_eq!(format_quantity(dec!(667), 0), "667");
        assert_eq!(format_quantity(dec!(0.00000001), 8), "0.00000001");
        assert_eq!(format_quantity(dec!(1000000), 2), "1000000.00");
    }

    #[test]
    fn test_invalid_inputs() {
        let cases = [
            (dec!(100), dec!(0), 1, dec!(100)),
            (dec!(100), dec!(-1), 1, dec!(100)),
            (dec!(100), dec!(50000), 0, dec!(100)),
            (dec!(0), dec!(50000), 1, dec!(100)),
            (dec!(-5), dec!(50000), 1, dec!(100)),
            (dec!(100), dec!(50000), 1, dec!(-1)),
        ];
        for (notional, price, leverage, min) in cases {
            let err = size_order(notional, price, leverage, min, LotSize::decimals(3)).unwrap_err();
            assert!(matches!(err, TesterError::Validation(_)));
        }
    }

    #[test]
    fn test_minimum_notional_always_met() {
        let prices = [
            dec!(0.0001),
            dec!(0.15),
            dec!(0.987654),
            dec!(1),
            dec!(3.3333),
            dec!(27.1),
            dec!(1999.99),
            dec!(50000),
            dec!(98765.4321),
        ];
        let notionals = [dec!(0.01), dec!(1), dec!(5.5), dec!(99.99), dec!(100), dec!(2500)];
        let leverages = [1, 2, 10, 125];

        for price in prices {
            for notional in notionals {
                for leverage in leverages {
                    for precision in 0..=6 {
                        let sized =
                            size_order(notional, price, leverage, dec!(100), LotSize::decimals(precision))
                                .unwrap();
                        assert!(
                            sized.notional(price) >= dec!(100),
                            "price={price} notional={notional} lev={leverage} dp={precision}"
                        );
                        assert!(sized.quantity.scale() <= precision);
                        assert_eq!(
                            sized.to_wire().split('.').nth(1).map(|d| d.len()).unwrap_or(0),
                            precision as usize
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_step_sizes_are_respected() {
        let steps = [dec!(0.5), dec!(5), dec!(0.025), dec!(0.001)];
        let prices = [dec!(0.15), dec!(3.3333), dec!(150), dec!(50000)];
        let notionals = [dec!(1), dec!(100), dec!(777.7)];

        for step in steps {
            let lot = LotSize::from_step(step);
            for price in prices {
                for notional in notionals {
                    let sized = size_order(notional, price, 3, dec!(100), lot).unwrap();
                    assert!(sized.notional(price) >= dec!(100), "step={step} price={price}");
                    assert!((sized.quantity % step).is_zero(), "step={step} q={}", sized.quantity);
                }
            }
        }

        // 100 / 0.15 = 666.67 -> next multiple of 5
        let sized = size_order(dec!(100), dec!(0.15), 1, dec!(100), LotSize::from_step(dec!(5))).unwrap();
        assert_eq!(sized.to_wire(), "670");
    }

    #[test]
    fn test_huge_order_value_is_rejected() {
        let huge = Decimal::MAX;

        let err = size_order(huge, dec!(0.15), 1, dec!(100), LotSize::decimals(0)).unwrap_err();
        assert!(matches!(err, TesterError::Validation(ref m) if m == "order value too large"));

        let err = size_order(huge, dec!(50000), 125, dec!(100), LotSize::decimals(3)).unwrap_err();
        assert!(matches!(err, TesterError::Validation(_)));

        let err = size_order(dec!(100), dec!(0.0000001), 1, huge, LotSize::decimals(0)).unwrap_err();
        assert!(matches!(err, TesterError::Validation(_)));
    }

    #[test]
    fn test_sizer_uses_registry_precision() {
        let registry = InstrumentRegistry::new(HashMap::new(), dec!(100));
        let sizer = OrderSizer::new(&registry);

        let sized = sizer
            .compute_order_quantity("DOGEUSDT", dec!(100), dec!(0.15), 1, dec!(100))
            .unwrap();
        assert_eq!(sized.to_wire(), "667");

        let sized = sizer
            .compute_order_quantity("SOLUSDT", dec!(100), dec!(150), 1, dec!(100))
            .unwrap();
        // 0.666.. -> 0.7
        assert_eq!(sized.to_wire(), "0.7");
    }
}
