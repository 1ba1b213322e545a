//! Currency arithmetic on `rust_decimal::Decimal`.
//!
//! Every amount stored or returned by the system has exactly two fractional
//! digits. Rounding is half-up (midpoint away from zero).

use rust_decimal::prelude::*;

/// Fractional digits kept for every monetary amount
pub const CURRENCY_DECIMAL_PLACES: u32 = 2;

/// Smallest price a menu item may carry (0.01)
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest price a menu item may carry (999999.99, eight digits in total)
pub const MAX_PRICE: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

/// Largest line subtotal or order total that can be stored (99999999.99, ten
/// digits in total). 9_999_999_999 split as `2 * 2^32 + 1_410_065_407`.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Round to two decimal places (half-up) and pin the scale to two digits,
/// so `20` renders as `"20.00"`.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_DECIMAL_PLACES);
    rounded
}

/// `unit_price × quantity`, rounded.
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    round_currency(unit_price * Decimal::from(quantity))
}

/// Sum a sequence of amounts and round the result once.
pub fn sum_currency<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round_currency(amounts.into_iter().fold(Decimal::ZERO, |acc, amount| acc + amount))
}

/// True when `value` carries no more than two significant fractional digits.
pub fn has_currency_precision(value: Decimal) -> bool {
    value.normalize().scale() <= CURRENCY_DECIMAL_PLACES
}
