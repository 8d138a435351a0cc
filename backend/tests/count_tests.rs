//! Count capture tests
//!
//! Tests for count validation and the additive merge rule: a submission
//! with an existing (product, series, expiry) key adds to the stored
//! quantity instead of overwriting it.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

use shared::validation::{
    normalize_series, validate_count_quantity, validate_expiry_date, validate_series,
    MAX_EXPIRY_YEAR, MIN_EXPIRY_YEAR,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The merge rule applied by the count store on submission
fn merge_submission(
    store: &mut BTreeMap<(String, NaiveDate), Decimal>,
    series: &str,
    expiry: NaiveDate,
    quantity: Decimal,
) {
    *store
        .entry((series.to_string(), expiry))
        .or_insert(Decimal::ZERO) += quantity;
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_same_key_accumulates() {
        let mut store = BTreeMap::new();
        merge_submission(&mut store, "A1", date(2026, 1, 1), dec("10"));
        merge_submission(&mut store, "A1", date(2026, 1, 1), dec("2.5"));

        assert_eq!(store.len(), 1);
        assert_eq!(store[&("A1".to_string(), date(2026, 1, 1))], dec("12.5"));
    }

    #[test]
    fn test_different_keys_stay_separate() {
        let mut store = BTreeMap::new();
        merge_submission(&mut store, "A1", date(2026, 1, 1), dec("10"));
        merge_submission(&mut store, "A1", date(2027, 1, 1), dec("3"));
        merge_submission(&mut store, "B2", date(2026, 1, 1), dec("4"));

        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(validate_count_quantity(dec("0.01")).is_ok());
        assert!(validate_count_quantity(Decimal::ZERO).is_err());
        assert!(validate_count_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_expiry_window_bounds() {
        assert!(validate_expiry_date(date(MIN_EXPIRY_YEAR, 1, 1)).is_ok());
        assert!(validate_expiry_date(date(MAX_EXPIRY_YEAR, 12, 31)).is_ok());
        assert!(validate_expiry_date(date(MIN_EXPIRY_YEAR - 1, 12, 31)).is_err());
        assert!(validate_expiry_date(date(MAX_EXPIRY_YEAR + 1, 1, 1)).is_err());
    }

    #[test]
    fn test_series_normalization() {
        assert_eq!(normalize_series(Some(" LOT-17 ")), "LOT-17");
        assert_eq!(normalize_series(None), "");
        assert!(validate_series(&normalize_series(Some("A1"))).is_ok());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn expiry_strategy() -> impl Strategy<Value = NaiveDate> {
        (2025i32..=2050, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn series_strategy() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), Just("A1".to_string()), Just("B2".to_string())]
    }

    proptest! {
        /// The stored total per key equals the sum of its submissions,
        /// independent of submission order
        #[test]
        fn prop_merge_totals_submissions(
            submissions in prop::collection::vec(
                (series_strategy(), expiry_strategy(), quantity_strategy()),
                1..20
            )
        ) {
            let mut store = BTreeMap::new();
            for (series, expiry, qty) in &submissions {
                merge_submission(&mut store, series, *expiry, *qty);
            }

            let stored_total: Decimal = store.values().copied().sum();
            let submitted_total: Decimal = submissions.iter().map(|(_, _, q)| *q).sum();
            prop_assert_eq!(stored_total, submitted_total);

            let mut reversed_store = BTreeMap::new();
            for (series, expiry, qty) in submissions.iter().rev() {
                merge_submission(&mut reversed_store, series, *expiry, *qty);
            }
            prop_assert_eq!(store, reversed_store);
        }

        /// Valid expiry years are accepted, everything else rejected
        #[test]
        fn prop_expiry_window(year in 1990i32..2100, month in 1u32..=12, day in 1u32..=28) {
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let in_window = (MIN_EXPIRY_YEAR..=MAX_EXPIRY_YEAR).contains(&year);
            prop_assert_eq!(validate_expiry_date(date).is_ok(), in_window);
        }

        /// Positive quantities validate, non-positive never do
        #[test]
        fn prop_quantity_sign(n in -10_000i64..=10_000) {
            let quantity = Decimal::new(n, 1);
            prop_assert_eq!(
                validate_count_quantity(quantity).is_ok(),
                quantity > Decimal::ZERO
            );
        }
    }
}
