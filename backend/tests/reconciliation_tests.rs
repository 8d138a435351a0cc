//! Reconciliation engine tests
//!
//! Exercises the pure engine core over ledger/count fixtures:
//! - product totals are compared, batch granularity only on the ledger side
//! - the first batch-line by (series, expiry) absorbs the whole difference
//! - counts without a ledger product surface as unaccounted, one per record
//! - output is deterministic and independent of input order

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::ResultStatus;
use warehouse_revision_backend::services::reconciliation::{reconcile, CountEntry, LedgerEntry};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn product(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn revizor(n: u128) -> Uuid {
    Uuid::from_u128(0xFF00 + n)
}

fn ledger_line(product_id: Uuid, series: &str, expiry: Option<NaiveDate>, qty: &str) -> LedgerEntry {
    LedgerEntry {
        product_id,
        series: series.to_string(),
        expiry_date: expiry,
        quantity: dec(qty),
    }
}

fn count(revizor_id: Uuid, product_id: Uuid, series: &str, expiry: NaiveDate, qty: &str) -> CountEntry {
    CountEntry {
        revizor_id,
        product_id,
        series: series.to_string(),
        expiry_date: expiry,
        quantity: dec(qty),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Spec worked example: lines (10, 5), counted 12 -> shortage of 3 on
    /// the first line, second line untouched
    #[test]
    fn test_shortage_absorbed_by_first_line() {
        let p = product(1);
        let ledger = vec![
            ledger_line(p, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p, "B", Some(date(2027, 1, 1)), "5"),
        ];
        let counts = vec![count(revizor(1), p, "", date(2026, 1, 1), "12")];

        let outcome = reconcile(&ledger, &counts);

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].expected_quantity, dec("10"));
        assert_eq!(outcome.results[0].actual_quantity, dec("7"));
        assert_eq!(outcome.results[0].difference, dec("-3"));
        assert_eq!(outcome.results[0].status, ResultStatus::Shortage);
        assert_eq!(outcome.results[1].expected_quantity, dec("5"));
        assert_eq!(outcome.results[1].actual_quantity, dec("5"));
        assert_eq!(outcome.results[1].difference, dec("0"));
        assert_eq!(outcome.results[1].status, ResultStatus::Correct);
        assert!(outcome.unaccounted.is_empty());
    }

    /// Counting more than expected yields an excess on the first line
    #[test]
    fn test_excess() {
        let p = product(1);
        let ledger = vec![ledger_line(p, "A", Some(date(2026, 1, 1)), "10")];
        let counts = vec![count(revizor(1), p, "", date(2026, 1, 1), "13.5")];

        let outcome = reconcile(&ledger, &counts);

        assert_eq!(outcome.results[0].difference, dec("3.5"));
        assert_eq!(outcome.results[0].actual_quantity, dec("13.5"));
        assert_eq!(outcome.results[0].status, ResultStatus::Excess);
    }

    /// Equal totals -> every emitted line is correct with difference 0
    #[test]
    fn test_equal_totals_all_correct() {
        let p = product(1);
        let ledger = vec![
            ledger_line(p, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p, "B", Some(date(2027, 1, 1)), "5"),
            ledger_line(p, "C", None, "2.5"),
        ];
        // Two revizors counting across shelves, 17.5 in total
        let counts = vec![
            count(revizor(1), p, "", date(2026, 1, 1), "10.5"),
            count(revizor(2), p, "", date(2026, 1, 1), "7"),
        ];

        let outcome = reconcile(&ledger, &counts);

        assert_eq!(outcome.results.len(), 3);
        for line in &outcome.results {
            assert_eq!(line.difference, dec("0"));
            assert_eq!(line.status, ResultStatus::Correct);
            assert_eq!(line.actual_quantity, line.expected_quantity);
        }
    }

    /// A ledger product nobody counted is a shortage of the whole total
    #[test]
    fn test_uncounted_product_full_shortage() {
        let p = product(1);
        let ledger = vec![
            ledger_line(p, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p, "B", Some(date(2027, 1, 1)), "5"),
        ];

        let outcome = reconcile(&ledger, &[]);

        assert_eq!(outcome.results[0].difference, dec("-15"));
        assert_eq!(outcome.results[0].status, ResultStatus::Shortage);
        // The sink line reports its own expected plus the product difference
        assert_eq!(outcome.results[0].actual_quantity, dec("-5"));
        assert_eq!(outcome.results[1].difference, dec("0"));
        assert!(outcome.results[0].revizor_ids.is_empty());
    }

    /// Spec example: counted product with no ledger line -> one unaccounted
    /// row carrying the record's own quantity and revizor
    #[test]
    fn test_unaccounted_row_per_count_record() {
        let ledgered = product(1);
        let unknown = product(2);
        let ledger = vec![ledger_line(ledgered, "A", Some(date(2026, 1, 1)), "10")];
        let counts = vec![
            count(revizor(1), ledgered, "", date(2026, 1, 1), "10"),
            count(revizor(1), unknown, "S1", date(2026, 3, 1), "4"),
            count(revizor(2), unknown, "S1", date(2026, 3, 1), "2"),
            count(revizor(2), unknown, "S2", date(2027, 3, 1), "1"),
        ];

        let outcome = reconcile(&ledger, &counts);

        // No aggregation on this path: one row per count record
        assert_eq!(outcome.unaccounted.len(), 3);
        assert_eq!(outcome.unaccounted[0].quantity, dec("4"));
        assert_eq!(outcome.unaccounted[0].revizor_id, revizor(1));
        assert_eq!(outcome.unaccounted[1].quantity, dec("2"));
        assert_eq!(outcome.unaccounted[1].revizor_id, revizor(2));
        assert_eq!(outcome.unaccounted[2].series, "S2");

        // The ledgered product is unaffected
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].status, ResultStatus::Correct);
    }

    /// Counts are merged per product regardless of the series/expiry the
    /// revizor entered
    #[test]
    fn test_count_side_ignores_batch_granularity() {
        let p = product(1);
        let ledger = vec![
            ledger_line(p, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p, "B", Some(date(2027, 1, 1)), "5"),
        ];
        // The revizor split the count across series that do not match the
        // ledger batches at all
        let counts = vec![
            count(revizor(1), p, "X", date(2030, 1, 1), "9"),
            count(revizor(1), p, "Y", date(2031, 1, 1), "6"),
        ];

        let outcome = reconcile(&ledger, &counts);

        assert_eq!(outcome.results.len(), 2);
        for line in &outcome.results {
            assert_eq!(line.status, ResultStatus::Correct);
        }
        assert!(outcome.unaccounted.is_empty());
    }

    /// Every contributing revizor is attached to every line of the product
    #[test]
    fn test_revizors_attached_to_all_lines() {
        let p = product(1);
        let ledger = vec![
            ledger_line(p, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p, "B", Some(date(2027, 1, 1)), "5"),
        ];
        let counts = vec![
            count(revizor(2), p, "", date(2026, 1, 1), "8"),
            count(revizor(1), p, "", date(2026, 1, 1), "4"),
        ];

        let outcome = reconcile(&ledger, &counts);

        let expected_revizors = vec![revizor(1), revizor(2)];
        for line in &outcome.results {
            assert_eq!(line.revizor_ids, expected_revizors);
        }
    }

    /// The absorption sink is the lowest (series, expiry) key, not the
    /// input order; a missing expiry sorts first
    #[test]
    fn test_first_line_is_lowest_sort_key() {
        let p = product(1);
        let ledger = vec![
            ledger_line(p, "B", Some(date(2026, 1, 1)), "5"),
            ledger_line(p, "A", Some(date(2027, 1, 1)), "10"),
            ledger_line(p, "A", Some(date(2026, 6, 1)), "3"),
            ledger_line(p, "A", None, "2"),
        ];
        let counts = vec![count(revizor(1), p, "", date(2026, 1, 1), "21")];

        let outcome = reconcile(&ledger, &counts);

        // Sorted: (A, None), (A, 2026-06-01), (A, 2027-01-01), (B, 2026-01-01)
        assert_eq!(outcome.results[0].series, "A");
        assert_eq!(outcome.results[0].expiry_date, None);
        assert_eq!(outcome.results[0].difference, dec("1"));
        assert_eq!(outcome.results[0].status, ResultStatus::Excess);
        for line in &outcome.results[1..] {
            assert_eq!(line.difference, dec("0"));
        }
        assert_eq!(outcome.results[3].series, "B");
    }

    /// Removing a count record removes its contribution on the next run
    #[test]
    fn test_deleted_count_no_longer_contributes() {
        let p = product(1);
        let ledger = vec![ledger_line(p, "A", Some(date(2026, 1, 1)), "10")];
        let counts = vec![
            count(revizor(1), p, "", date(2026, 1, 1), "6"),
            count(revizor(2), p, "", date(2026, 1, 1), "4"),
        ];

        let before = reconcile(&ledger, &counts);
        assert_eq!(before.results[0].status, ResultStatus::Correct);

        let after = reconcile(&ledger, &counts[..1]);
        assert_eq!(after.results[0].difference, dec("-4"));
        assert_eq!(after.results[0].status, ResultStatus::Shortage);
        assert_eq!(after.results[0].revizor_ids, vec![revizor(1)]);
    }

    /// Re-running over unchanged inputs yields identical output
    #[test]
    fn test_idempotent_over_unchanged_inputs() {
        let p1 = product(1);
        let p2 = product(2);
        let ledger = vec![
            ledger_line(p1, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p2, "B", None, "7"),
        ];
        let counts = vec![
            count(revizor(1), p1, "", date(2026, 1, 1), "8"),
            count(revizor(2), product(3), "S", date(2026, 1, 1), "2"),
        ];

        assert_eq!(reconcile(&ledger, &counts), reconcile(&ledger, &counts));
    }

    /// Input order is irrelevant: the engine orders by its own sort keys
    #[test]
    fn test_input_order_is_irrelevant() {
        let p1 = product(1);
        let p2 = product(2);
        let ledger = vec![
            ledger_line(p2, "B", Some(date(2027, 1, 1)), "5"),
            ledger_line(p1, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p1, "B", None, "3"),
        ];
        let counts = vec![
            count(revizor(2), p1, "", date(2026, 1, 1), "4"),
            count(revizor(1), p2, "", date(2026, 1, 1), "5"),
            count(revizor(1), product(9), "S", date(2026, 1, 1), "1"),
        ];

        let mut ledger_reversed = ledger.clone();
        ledger_reversed.reverse();
        let mut counts_reversed = counts.clone();
        counts_reversed.reverse();

        assert_eq!(
            reconcile(&ledger, &counts),
            reconcile(&ledger_reversed, &counts_reversed)
        );
    }

    /// Partition invariant on a mixed fixture: result differences plus
    /// unaccounted quantities reconstruct the whole gap
    #[test]
    fn test_partition_invariant_fixture() {
        let p1 = product(1);
        let p2 = product(2);
        let unknown = product(3);
        let ledger = vec![
            ledger_line(p1, "A", Some(date(2026, 1, 1)), "10"),
            ledger_line(p1, "B", Some(date(2027, 1, 1)), "5"),
            ledger_line(p2, "", None, "20"),
        ];
        let counts = vec![
            count(revizor(1), p1, "", date(2026, 1, 1), "12"),
            count(revizor(1), p2, "", date(2026, 1, 1), "19"),
            count(revizor(2), unknown, "S", date(2026, 1, 1), "4"),
        ];

        let outcome = reconcile(&ledger, &counts);

        let total_difference: Decimal = outcome.results.iter().map(|r| r.difference).sum();
        let total_unaccounted: Decimal = outcome.unaccounted.iter().map(|u| u.quantity).sum();
        let total_counted: Decimal = counts.iter().map(|c| c.quantity).sum();
        let total_expected: Decimal = ledger.iter().map(|l| l.quantity).sum();

        assert_eq!(
            total_difference + total_unaccounted,
            total_counted - total_expected
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for quantities in 0.1 .. 1000.0
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn expiry_strategy() -> impl Strategy<Value = NaiveDate> {
        (2025i32..=2050, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn series_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("A1".to_string()),
            Just("B2".to_string()),
            Just("C3".to_string()),
        ]
    }

    /// Ledger lines over products 0..4, unique per key tuple like the store
    fn ledger_strategy() -> impl Strategy<Value = Vec<LedgerEntry>> {
        prop::collection::vec(
            (
                0u128..4,
                series_strategy(),
                prop::option::of(expiry_strategy()),
                quantity_strategy(),
            ),
            0..12,
        )
        .prop_map(|raw| {
            let mut unique = BTreeMap::new();
            for (p, series, expiry, qty) in raw {
                unique.insert((p, series.clone(), expiry), (p, series, expiry, qty));
            }
            unique
                .into_values()
                .map(|(p, series, expiry_date, quantity)| LedgerEntry {
                    product_id: product(p),
                    series,
                    expiry_date,
                    quantity,
                })
                .collect()
        })
    }

    /// Counts over products 0..6, so some have no ledger line; unique per
    /// (revizor, product, series, expiry) like the count store
    fn counts_strategy() -> impl Strategy<Value = Vec<CountEntry>> {
        prop::collection::vec(
            (
                0u128..3,
                0u128..6,
                series_strategy(),
                expiry_strategy(),
                quantity_strategy(),
            ),
            0..12,
        )
        .prop_map(|raw| {
            let mut unique = BTreeMap::new();
            for (r, p, series, expiry, qty) in raw {
                unique.insert((r, p, series.clone(), expiry), (r, p, series, expiry, qty));
            }
            unique
                .into_values()
                .map(|(r, p, series, expiry_date, quantity)| CountEntry {
                    revizor_id: revizor(r),
                    product_id: product(p),
                    series,
                    expiry_date,
                    quantity,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Results plus unaccounted always partition the full gap:
        /// sum(differences) + sum(unaccounted) = sum(counts) - sum(ledger)
        #[test]
        fn prop_partition_invariant(
            ledger in ledger_strategy(),
            counts in counts_strategy()
        ) {
            let outcome = reconcile(&ledger, &counts);

            let total_difference: Decimal = outcome.results.iter().map(|r| r.difference).sum();
            let total_unaccounted: Decimal = outcome.unaccounted.iter().map(|u| u.quantity).sum();
            let total_counted: Decimal = counts.iter().map(|c| c.quantity).sum();
            let total_expected: Decimal = ledger.iter().map(|l| l.quantity).sum();

            prop_assert_eq!(
                total_difference + total_unaccounted,
                total_counted - total_expected
            );
        }

        /// One result line per ledger batch-line, and per product the
        /// difference sits on the first line only
        #[test]
        fn prop_difference_absorbed_once_per_product(
            ledger in ledger_strategy(),
            counts in counts_strategy()
        ) {
            let outcome = reconcile(&ledger, &counts);
            prop_assert_eq!(outcome.results.len(), ledger.len());

            let mut seen_products = std::collections::HashSet::new();
            for line in &outcome.results {
                if seen_products.insert(line.product_id) {
                    // First line of the product: actual = expected + difference
                    prop_assert_eq!(
                        line.actual_quantity,
                        line.expected_quantity + line.difference
                    );
                } else {
                    // Subsequent lines never carry a difference
                    prop_assert_eq!(line.difference, Decimal::ZERO);
                    prop_assert_eq!(line.status, ResultStatus::Correct);
                    prop_assert_eq!(line.actual_quantity, line.expected_quantity);
                }
            }
        }

        /// Statuses always agree with the sign of the difference
        #[test]
        fn prop_status_matches_difference_sign(
            ledger in ledger_strategy(),
            counts in counts_strategy()
        ) {
            let outcome = reconcile(&ledger, &counts);
            for line in &outcome.results {
                let expected_status = ResultStatus::from_difference(line.difference);
                prop_assert_eq!(line.status, expected_status);
            }
        }

        /// Every count record lands in exactly one bucket: unaccounted rows
        /// correspond one-to-one to count records of unledgered products
        #[test]
        fn prop_counts_partitioned(
            ledger in ledger_strategy(),
            counts in counts_strategy()
        ) {
            let outcome = reconcile(&ledger, &counts);

            let ledgered: std::collections::HashSet<Uuid> =
                ledger.iter().map(|l| l.product_id).collect();
            let expected_unaccounted = counts
                .iter()
                .filter(|c| !ledgered.contains(&c.product_id))
                .count();

            prop_assert_eq!(outcome.unaccounted.len(), expected_unaccounted);
        }

        /// Re-running and reordering never change the output
        #[test]
        fn prop_deterministic_and_order_independent(
            ledger in ledger_strategy(),
            counts in counts_strategy()
        ) {
            let baseline = reconcile(&ledger, &counts);

            prop_assert_eq!(&reconcile(&ledger, &counts), &baseline);

            let mut ledger_reversed = ledger.clone();
            ledger_reversed.reverse();
            let mut counts_reversed = counts.clone();
            counts_reversed.reverse();
            prop_assert_eq!(&reconcile(&ledger_reversed, &counts_reversed), &baseline);
        }

        /// Counting exactly the expected totals yields all-correct output
        #[test]
        fn prop_exact_counts_all_correct(ledger in ledger_strategy()) {
            // One count per ledgered product, matching its expected total
            let mut totals: BTreeMap<Uuid, Decimal> = BTreeMap::new();
            for line in &ledger {
                *totals.entry(line.product_id).or_insert(Decimal::ZERO) += line.quantity;
            }
            let counts: Vec<CountEntry> = totals
                .iter()
                .map(|(product_id, total)| CountEntry {
                    revizor_id: revizor(1),
                    product_id: *product_id,
                    series: String::new(),
                    expiry_date: date(2026, 1, 1),
                    quantity: *total,
                })
                .filter(|c| c.quantity > Decimal::ZERO)
                .collect();

            let outcome = reconcile(&ledger, &counts);
            for line in &outcome.results {
                prop_assert_eq!(line.difference, Decimal::ZERO);
                prop_assert_eq!(line.status, ResultStatus::Correct);
            }
            prop_assert!(outcome.unaccounted.is_empty());
        }
    }
}
