//! Reconciliation output queries
//!
//! Read side of the derived rows: result listings with status filter and
//! text search, status statistics, and the unaccounted listing. Rows are
//! produced by the reconciliation engine; this service never mutates them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::ResultStatus;

use crate::error::{AppError, AppResult};

/// Result query service
#[derive(Clone)]
pub struct ResultService {
    db: PgPool,
}

/// Filters for the result listing
#[derive(Debug, Default, Deserialize)]
pub struct ResultFilter {
    pub status: Option<ResultStatus>,
    /// Matches product name, product code or series, case-insensitive
    pub search: Option<String>,
}

/// One result line joined with product and revizor names
#[derive(Debug, Serialize)]
pub struct ResultView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub manufacturer: String,
    pub series: String,
    pub expiry_date: Option<NaiveDate>,
    pub expected_quantity: Decimal,
    pub actual_quantity: Decimal,
    pub difference: Decimal,
    pub status: ResultStatus,
    pub revizors: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}

/// Status statistics over all results of a revision
#[derive(Debug, Default, Serialize)]
pub struct ResultStats {
    pub total: i64,
    pub correct: i64,
    pub shortage: i64,
    pub excess: i64,
}

/// Result listing with its statistics
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub stats: ResultStats,
    pub results: Vec<ResultView>,
}

/// One unaccounted line joined with product and revizor names
#[derive(Debug, Serialize)]
pub struct UnaccountedView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub manufacturer: String,
    pub series: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
    pub revizor_id: Uuid,
    pub revizor_name: String,
    pub created_at: DateTime<Utc>,
}

impl ResultService {
    /// Create a new ResultService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List results of a revision with statistics
    pub async fn list(
        &self,
        admin_id: Uuid,
        revision_id: Uuid,
        filter: ResultFilter,
    ) -> AppResult<ResultsResponse> {
        self.check_revision(admin_id, revision_id).await?;

        // Statistics cover the whole revision, independent of filters
        let stat_rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM revision_results WHERE revision_id = $1 GROUP BY status",
        )
        .bind(revision_id)
        .fetch_all(&self.db)
        .await?;

        let mut stats = ResultStats::default();
        for (status, count) in stat_rows {
            stats.total += count;
            match ResultStatus::from_str(&status) {
                Some(ResultStatus::Correct) => stats.correct = count,
                Some(ResultStatus::Shortage) => stats.shortage = count,
                Some(ResultStatus::Excess) => stats.excess = count,
                None => {
                    return Err(AppError::Internal(format!(
                        "Unknown result status: {}",
                        status
                    )))
                }
            }
        }

        let status_filter = filter.status.map(|s| s.as_str().to_string());
        let search_filter = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let rows = sqlx::query_as::<_, ResultViewRow>(
            r#"
            SELECT rr.id, rr.product_id, p.code, p.name, p.manufacturer,
                   rr.series, rr.expiry_date, rr.expected_quantity, rr.actual_quantity,
                   rr.difference, rr.status, rr.calculated_at,
                   COALESCE(
                       ARRAY_AGG(u.full_name ORDER BY u.full_name)
                           FILTER (WHERE u.id IS NOT NULL),
                       '{}'
                   ) AS revizors
            FROM revision_results rr
            JOIN products p ON p.id = rr.product_id
            LEFT JOIN revision_result_revizors rv ON rv.result_id = rr.id
            LEFT JOIN users u ON u.id = rv.revizor_id
            WHERE rr.revision_id = $1
              AND ($2::text IS NULL OR rr.status = $2)
              AND ($3::text IS NULL
                   OR p.name ILIKE '%' || $3 || '%'
                   OR p.code ILIKE '%' || $3 || '%'
                   OR rr.series ILIKE '%' || $3 || '%')
            GROUP BY rr.id, p.code, p.name, p.manufacturer
            ORDER BY rr.status, p.name, rr.series
            "#,
        )
        .bind(revision_id)
        .bind(status_filter)
        .bind(search_filter)
        .fetch_all(&self.db)
        .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(result_view_from_row(row)?);
        }

        Ok(ResultsResponse { stats, results })
    }

    /// List unaccounted items of a revision
    pub async fn list_unaccounted(
        &self,
        admin_id: Uuid,
        revision_id: Uuid,
    ) -> AppResult<Vec<UnaccountedView>> {
        self.check_revision(admin_id, revision_id).await?;

        let rows = sqlx::query_as::<_, UnaccountedViewRow>(
            r#"
            SELECT ui.id, ui.product_id, p.code, p.name, p.manufacturer,
                   ui.series, ui.expiry_date, ui.quantity,
                   ui.revizor_id, u.full_name, ui.created_at
            FROM unaccounted_items ui
            JOIN products p ON p.id = ui.product_id
            JOIN users u ON u.id = ui.revizor_id
            WHERE ui.revision_id = $1
            ORDER BY p.name, ui.series, ui.expiry_date, u.full_name
            "#,
        )
        .bind(revision_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UnaccountedView {
                id: r.0,
                product_id: r.1,
                product_code: r.2,
                product_name: r.3,
                manufacturer: r.4,
                series: r.5,
                expiry_date: r.6,
                quantity: r.7,
                revizor_id: r.8,
                revizor_name: r.9,
                created_at: r.10,
            })
            .collect())
    }

    /// The revision must belong to a warehouse of this admin
    async fn check_revision(&self, admin_id: Uuid, revision_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM revisions r
                JOIN warehouses w ON w.id = r.warehouse_id
                WHERE r.id = $1 AND w.created_by = $2
            )
            "#,
        )
        .bind(revision_id)
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Revision".to_string()));
        }
        Ok(())
    }
}

type ResultViewRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    String,
    Option<NaiveDate>,
    Decimal,
    Decimal,
    Decimal,
    String,
    DateTime<Utc>,
    Vec<String>,
);

fn result_view_from_row(row: ResultViewRow) -> AppResult<ResultView> {
    let status = ResultStatus::from_str(&row.10)
        .ok_or_else(|| AppError::Internal(format!("Unknown result status: {}", row.10)))?;
    Ok(ResultView {
        id: row.0,
        product_id: row.1,
        product_code: row.2,
        product_name: row.3,
        manufacturer: row.4,
        series: row.5,
        expiry_date: row.6,
        expected_quantity: row.7,
        actual_quantity: row.8,
        difference: row.9,
        status,
        revizors: row.12,
        calculated_at: row.11,
    })
}

type UnaccountedViewRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    String,
    NaiveDate,
    Decimal,
    Uuid,
    String,
    DateTime<Utc>,
);
