//! Premium and payout arithmetic
//!
//! Both premiums and payouts are basis-point fractions of coverage, floored
//! to whole units: premium = floor(coverage × rate_bps / 10000).

use cropguard_common::BPS_DENOMINATOR;
use rust_decimal::Decimal;

/// floor(amount × bps / 10000)
pub fn apply_bps(amount: Decimal, bps: u32) -> Decimal {
    (amount * Decimal::from(bps) / Decimal::from(BPS_DENOMINATOR)).floor()
}

/// Premium charged for `coverage` at a fixed rate
pub fn calculate_premium(coverage: Decimal, base_rate_bps: u32) -> Decimal {
    apply_bps(coverage, base_rate_bps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_premium_floors() {
        assert_eq!(calculate_premium(dec!(1000), 700), dec!(70));
        assert_eq!(calculate_premium(dec!(999), 700), dec!(69));
        assert_eq!(calculate_premium(dec!(100), 0), dec!(0));
    }

    #[test]
    fn test_fractional_payout() {
        assert_eq!(apply_bps(dec!(1000), 7_500), dec!(750));
        assert_eq!(apply_bps(dec!(333), 7_500), dec!(249));
        assert_eq!(apply_bps(dec!(1000), 10_000), dec!(1000));
    }

    proptest! {
        #[test]
        fn prop_premium_is_floor_of_exact(coverage in 1u64..10_000_000, bps in 0u32..=10_000) {
            let premium = calculate_premium(Decimal::from(coverage), bps);
            let exact = coverage as u128 * bps as u128 / 10_000;
            prop_assert_eq!(premium, Decimal::from(exact as u64));
            prop_assert!(premium <= Decimal::from(coverage));
        }
    }
}
