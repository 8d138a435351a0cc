//! Reconciliation engine
//!
//! Compares the expected-stock ledger of a warehouse against the counts
//! submitted during a revision and materializes result rows and
//! unaccounted rows.
//!
//! Revizors count at the product level while the ledger is batch-structured,
//! so totals are compared per product and the whole product-level difference
//! is attributed to a single deterministic batch-line: the first by
//! (series, expiry) ascending order. Counts whose product has no ledger line
//! anywhere in the warehouse are surfaced per count record as unaccounted.
//!
//! The engine is pure over its inputs and never fails: upstream validation
//! guarantees well-typed ledger lines and count records. Persistence is an
//! all-or-nothing replace of the derived rows inside the caller's
//! transaction, so re-running over unchanged inputs is idempotent and a
//! crash mid-run never leaves partial derived state.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use shared::models::ResultStatus;

use crate::error::AppResult;

/// One expected-stock batch-line, engine input
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub product_id: Uuid,
    pub series: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
}

/// One counted-quantity record, engine input
#[derive(Debug, Clone, PartialEq)]
pub struct CountEntry {
    pub revizor_id: Uuid,
    pub product_id: Uuid,
    pub series: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
}

/// One derived result line, emitted per ledger batch-line
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    pub product_id: Uuid,
    pub series: String,
    pub expiry_date: Option<NaiveDate>,
    pub expected_quantity: Decimal,
    pub actual_quantity: Decimal,
    pub difference: Decimal,
    pub status: ResultStatus,
    /// Every revizor who counted the product, attached to every line of it
    pub revizor_ids: Vec<Uuid>,
}

/// One derived unaccounted line, emitted per count record whose product
/// is absent from the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct UnaccountedLine {
    pub product_id: Uuid,
    pub series: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
    pub revizor_id: Uuid,
}

/// Complete engine output for one revision
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationOutcome {
    pub results: Vec<ResultLine>,
    pub unaccounted: Vec<UnaccountedLine>,
}

/// Row counts of a persisted engine run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineRunSummary {
    pub result_lines: usize,
    pub unaccounted_lines: usize,
}

/// Compute the reconciliation outcome for one revision.
///
/// Output order is fully deterministic: products by id, batch-lines by
/// (series, expiry) with a missing expiry sorting first, unaccounted lines
/// by (product, series, expiry, revizor). Running twice over the same
/// inputs yields identical output.
pub fn reconcile(ledger: &[LedgerEntry], counts: &[CountEntry]) -> ReconciliationOutcome {
    // Pass 1: group ledger batch-lines by product, in deterministic order
    let mut ledger_by_product: BTreeMap<Uuid, Vec<&LedgerEntry>> = BTreeMap::new();
    for line in ledger {
        ledger_by_product
            .entry(line.product_id)
            .or_default()
            .push(line);
    }
    for lines in ledger_by_product.values_mut() {
        lines.sort_by(|a, b| {
            a.series
                .cmp(&b.series)
                .then(a.expiry_date.cmp(&b.expiry_date))
        });
    }

    // Pass 2: product-level count totals. Revizors report product totals,
    // so the series/expiry they entered are ignored on this side.
    let mut counted: BTreeMap<Uuid, (Decimal, BTreeSet<Uuid>)> = BTreeMap::new();
    for count in counts {
        let entry = counted
            .entry(count.product_id)
            .or_insert_with(|| (Decimal::ZERO, BTreeSet::new()));
        entry.0 += count.quantity;
        entry.1.insert(count.revizor_id);
    }

    // Emit one result line per ledger batch-line; the first line of each
    // product absorbs the whole product-level difference.
    let mut results = Vec::with_capacity(ledger.len());
    for (product_id, lines) in &ledger_by_product {
        let expected_total: Decimal = lines.iter().map(|l| l.quantity).sum();
        let (actual_total, revizor_ids) = match counted.get(product_id) {
            Some((total, revizors)) => (*total, revizors.iter().copied().collect::<Vec<_>>()),
            None => (Decimal::ZERO, Vec::new()),
        };

        let difference = actual_total - expected_total;
        let status = ResultStatus::from_difference(difference);

        for (idx, line) in lines.iter().enumerate() {
            let (line_difference, line_status) = if idx == 0 {
                (difference, status)
            } else {
                (Decimal::ZERO, ResultStatus::Correct)
            };

            results.push(ResultLine {
                product_id: *product_id,
                series: line.series.clone(),
                expiry_date: line.expiry_date,
                expected_quantity: line.quantity,
                actual_quantity: line.quantity + line_difference,
                difference: line_difference,
                status: line_status,
                revizor_ids: revizor_ids.clone(),
            });
        }
    }

    // Counted products absent from the ledger: one unaccounted line per
    // count record, no aggregation (there is no ledger total to compare).
    let mut unaccounted: Vec<UnaccountedLine> = counts
        .iter()
        .filter(|count| !ledger_by_product.contains_key(&count.product_id))
        .map(|count| UnaccountedLine {
            product_id: count.product_id,
            series: count.series.clone(),
            expiry_date: count.expiry_date,
            quantity: count.quantity,
            revizor_id: count.revizor_id,
        })
        .collect();
    unaccounted.sort_by(|a, b| {
        a.product_id
            .cmp(&b.product_id)
            .then_with(|| a.series.cmp(&b.series))
            .then(a.expiry_date.cmp(&b.expiry_date))
            .then(a.revizor_id.cmp(&b.revizor_id))
    });

    ReconciliationOutcome {
        results,
        unaccounted,
    }
}

/// Recompute and persist the derived rows of a revision.
///
/// Runs inside the caller's transaction so the delete-then-insert replace
/// commits (or rolls back) together with the lifecycle transition that
/// triggered it. Readers never observe a half-cleared result set.
pub async fn recalculate_revision(
    tx: &mut Transaction<'_, Postgres>,
    revision_id: Uuid,
    warehouse_id: Uuid,
) -> AppResult<EngineRunSummary> {
    // Load engine inputs
    let ledger_rows: Vec<(Uuid, String, Option<NaiveDate>, Decimal)> = sqlx::query_as(
        "SELECT product_id, series, expiry_date, quantity FROM ledger_lines WHERE warehouse_id = $1",
    )
    .bind(warehouse_id)
    .fetch_all(&mut **tx)
    .await?;

    let count_rows: Vec<(Uuid, Uuid, String, NaiveDate, Decimal)> = sqlx::query_as(
        "SELECT revizor_id, product_id, series, expiry_date, quantity FROM count_records WHERE revision_id = $1",
    )
    .bind(revision_id)
    .fetch_all(&mut **tx)
    .await?;

    let ledger: Vec<LedgerEntry> = ledger_rows
        .into_iter()
        .map(|(product_id, series, expiry_date, quantity)| LedgerEntry {
            product_id,
            series,
            expiry_date,
            quantity,
        })
        .collect();

    let counts: Vec<CountEntry> = count_rows
        .into_iter()
        .map(
            |(revizor_id, product_id, series, expiry_date, quantity)| CountEntry {
                revizor_id,
                product_id,
                series,
                expiry_date,
                quantity,
            },
        )
        .collect();

    let outcome = reconcile(&ledger, &counts);

    // Replace the derived rows wholesale; prior output is never merged
    sqlx::query("DELETE FROM revision_results WHERE revision_id = $1")
        .bind(revision_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM unaccounted_items WHERE revision_id = $1")
        .bind(revision_id)
        .execute(&mut **tx)
        .await?;

    for line in &outcome.results {
        let result_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO revision_results (
                revision_id, product_id, series, expiry_date,
                expected_quantity, actual_quantity, difference, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(revision_id)
        .bind(line.product_id)
        .bind(&line.series)
        .bind(line.expiry_date)
        .bind(line.expected_quantity)
        .bind(line.actual_quantity)
        .bind(line.difference)
        .bind(line.status.as_str())
        .fetch_one(&mut **tx)
        .await?;

        for revizor_id in &line.revizor_ids {
            sqlx::query(
                "INSERT INTO revision_result_revizors (result_id, revizor_id) VALUES ($1, $2)",
            )
            .bind(result_id)
            .bind(revizor_id)
            .execute(&mut **tx)
            .await?;
        }
    }

    for item in &outcome.unaccounted {
        sqlx::query(
            r#"
            INSERT INTO unaccounted_items (
                revision_id, product_id, series, expiry_date, quantity, revizor_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(revision_id)
        .bind(item.product_id)
        .bind(&item.series)
        .bind(item.expiry_date)
        .bind(item.quantity)
        .bind(item.revizor_id)
        .execute(&mut **tx)
        .await?;
    }

    let summary = EngineRunSummary {
        result_lines: outcome.results.len(),
        unaccounted_lines: outcome.unaccounted.len(),
    };

    tracing::info!(
        %revision_id,
        result_lines = summary.result_lines,
        unaccounted_lines = summary.unaccounted_lines,
        "reconciliation recomputed"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_batch_line_absorbs_difference() {
        let product = Uuid::new_v4();
        let revizor = Uuid::new_v4();
        let ledger = vec![
            LedgerEntry {
                product_id: product,
                series: "A".to_string(),
                expiry_date: Some(date(2026, 1, 1)),
                quantity: dec("10"),
            },
            LedgerEntry {
                product_id: product,
                series: "B".to_string(),
                expiry_date: Some(date(2027, 1, 1)),
                quantity: dec("5"),
            },
        ];
        let counts = vec![CountEntry {
            revizor_id: revizor,
            product_id: product,
            series: String::new(),
            expiry_date: date(2026, 1, 1),
            quantity: dec("12"),
        }];

        let outcome = reconcile(&ledger, &counts);

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.unaccounted.is_empty());

        let first = &outcome.results[0];
        assert_eq!(first.series, "A");
        assert_eq!(first.actual_quantity, dec("7"));
        assert_eq!(first.difference, dec("-3"));
        assert_eq!(first.status, ResultStatus::Shortage);

        let second = &outcome.results[1];
        assert_eq!(second.series, "B");
        assert_eq!(second.actual_quantity, dec("5"));
        assert_eq!(second.difference, dec("0"));
        assert_eq!(second.status, ResultStatus::Correct);

        // Every line of the product carries the contributing revizors
        assert_eq!(first.revizor_ids, vec![revizor]);
        assert_eq!(second.revizor_ids, vec![revizor]);
    }

    #[test]
    fn test_unaccounted_product() {
        let product = Uuid::new_v4();
        let revizor = Uuid::new_v4();
        let counts = vec![CountEntry {
            revizor_id: revizor,
            product_id: product,
            series: "S1".to_string(),
            expiry_date: date(2026, 5, 1),
            quantity: dec("4"),
        }];

        let outcome = reconcile(&[], &counts);

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.unaccounted.len(), 1);
        assert_eq!(outcome.unaccounted[0].quantity, dec("4"));
        assert_eq!(outcome.unaccounted[0].revizor_id, revizor);
    }

    #[test]
    fn test_empty_inputs() {
        let outcome = reconcile(&[], &[]);
        assert!(outcome.results.is_empty());
        assert!(outcome.unaccounted.is_empty());
    }
}
