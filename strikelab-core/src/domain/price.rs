//! Fixed-point price helpers.
//!
//! Every derived price (target, stoploss, trigger, square-off close, PNL) is
//! carried at `PRICE_DP` decimal places so that repeated arithmetic across
//! thousands of rows reproduces the same values on every run.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places carried on every derived price.
pub const PRICE_DP: u32 = 3;

/// Largest price a loaded bar may carry.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Round a price to `PRICE_DP` places, half-to-even.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_DP, RoundingStrategy::MidpointNearestEven)
}

/// Format a price with exactly `PRICE_DP` places (e.g. `99.500`).
pub fn format_price(value: Decimal) -> String {
    format!("{:.*}", PRICE_DP as usize, round_price(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_to_three_places() {
        assert_eq!(round_price(dec!(123.45678)), dec!(123.457));
        assert_eq!(round_price(dec!(10)), dec!(10));
    }

    #[test]
    fn midpoint_rounds_to_even() {
        assert_eq!(round_price(dec!(1.0005)), dec!(1.000));
        assert_eq!(round_price(dec!(1.0015)), dec!(1.002));
    }

    #[test]
    fn formats_with_fixed_places() {
        assert_eq!(format_price(dec!(99.5)), "99.500");
        assert_eq!(format_price(dec!(0.025)), "0.025");
        assert_eq!(format_price(dec!(-12)), "-12.000");
    }
}
