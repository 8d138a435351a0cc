//! Count capture service
//!
//! Revizors submit counted quantities while a revision is in progress.
//! Submissions are unique per (revision, revizor, product, series, expiry);
//! submitting the same key again adds to the stored quantity, since stock
//! of one batch is often counted shelf by shelf.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::RevisionStatus;
use shared::validation::{
    normalize_series, validate_count_quantity, validate_expiry_date, validate_series,
};

use crate::error::{AppError, AppResult};

/// Count capture service
#[derive(Clone)]
pub struct CountService {
    db: PgPool,
}

/// Input for submitting a count
#[derive(Debug, Deserialize)]
pub struct AddCountInput {
    pub product_id: Uuid,
    pub series: Option<String>,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
}

/// Input for setting an absolute quantity on an existing record
#[derive(Debug, Deserialize)]
pub struct UpdateCountInput {
    pub quantity: Decimal,
}

/// Count record joined with its product
#[derive(Debug, Serialize)]
pub struct CountView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub manufacturer: String,
    pub series: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A revizor's own counts with totals
#[derive(Debug, Serialize)]
pub struct MyCountsResponse {
    pub items: Vec<CountView>,
    pub total_items: usize,
    pub total_quantity: Decimal,
}

impl CountService {
    /// Create a new CountService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Submit a count; an existing record with the same key accumulates
    pub async fn add(
        &self,
        revizor_id: Uuid,
        revision_id: Uuid,
        input: AddCountInput,
    ) -> AppResult<CountView> {
        self.check_revision_in_progress(revision_id).await?;
        self.check_assignment(revizor_id, revision_id).await?;

        let series = normalize_series(input.series.as_deref());

        validate_count_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_uz: "Miqdor 0 dan katta bo'lishi kerak".to_string(),
        })?;
        validate_expiry_date(input.expiry_date).map_err(|msg| AppError::Validation {
            field: "expiry_date".to_string(),
            message: msg.to_string(),
            message_uz: "Muddat 2025-2050 oralig'ida bo'lishi kerak".to_string(),
        })?;
        validate_series(&series).map_err(|msg| AppError::Validation {
            field: "series".to_string(),
            message: msg.to_string(),
            message_uz: "Seriya juda uzun".to_string(),
        })?;

        let product_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(input.product_id)
                .fetch_one(&self.db)
                .await?;
        if !product_exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        // First submission moves the assignment from assigned to working
        sqlx::query(
            r#"
            UPDATE revision_assignments
            SET status = 'working'
            WHERE revision_id = $1 AND revizor_id = $2 AND status = 'assigned'
            "#,
        )
        .bind(revision_id)
        .bind(revizor_id)
        .execute(&self.db)
        .await?;

        // Additive merge on the unique key
        let count_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO count_records (revision_id, revizor_id, product_id, series, expiry_date, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (revision_id, revizor_id, product_id, series, expiry_date)
            DO UPDATE SET quantity = count_records.quantity + EXCLUDED.quantity, updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(revision_id)
        .bind(revizor_id)
        .bind(input.product_id)
        .bind(&series)
        .bind(input.expiry_date)
        .bind(input.quantity)
        .fetch_one(&self.db)
        .await?;

        self.get_view(count_id).await
    }

    /// List the revizor's own counts for a revision
    pub async fn list_mine(
        &self,
        revizor_id: Uuid,
        revision_id: Uuid,
    ) -> AppResult<MyCountsResponse> {
        self.check_assignment(revizor_id, revision_id).await?;

        let rows = sqlx::query_as::<_, CountViewRow>(
            r#"
            SELECT c.id, c.product_id, p.code, p.name, p.manufacturer,
                   c.series, c.expiry_date, c.quantity, c.created_at, c.updated_at
            FROM count_records c
            JOIN products p ON p.id = c.product_id
            WHERE c.revision_id = $1 AND c.revizor_id = $2
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(revision_id)
        .bind(revizor_id)
        .fetch_all(&self.db)
        .await?;

        let items: Vec<CountView> = rows.into_iter().map(view_from_row).collect();
        let total_quantity = items.iter().map(|i| i.quantity).sum();

        Ok(MyCountsResponse {
            total_items: items.len(),
            total_quantity,
            items,
        })
    }

    /// Set an absolute quantity on an owned record
    pub async fn update(
        &self,
        revizor_id: Uuid,
        count_id: Uuid,
        input: UpdateCountInput,
    ) -> AppResult<CountView> {
        validate_count_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_uz: "Miqdor 0 dan katta bo'lishi kerak".to_string(),
        })?;

        self.check_count_mutable(revizor_id, count_id).await?;

        sqlx::query("UPDATE count_records SET quantity = $1, updated_at = NOW() WHERE id = $2")
            .bind(input.quantity)
            .bind(count_id)
            .execute(&self.db)
            .await?;

        self.get_view(count_id).await
    }

    /// Delete an owned record; its contribution disappears from the next
    /// engine run
    pub async fn delete(&self, revizor_id: Uuid, count_id: Uuid) -> AppResult<()> {
        self.check_count_mutable(revizor_id, count_id).await?;

        sqlx::query("DELETE FROM count_records WHERE id = $1")
            .bind(count_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Fetch one record joined with its product
    async fn get_view(&self, count_id: Uuid) -> AppResult<CountView> {
        let row = sqlx::query_as::<_, CountViewRow>(
            r#"
            SELECT c.id, c.product_id, p.code, p.name, p.manufacturer,
                   c.series, c.expiry_date, c.quantity, c.created_at, c.updated_at
            FROM count_records c
            JOIN products p ON p.id = c.product_id
            WHERE c.id = $1
            "#,
        )
        .bind(count_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Count record".to_string()))?;

        Ok(view_from_row(row))
    }

    /// The record must belong to the revizor and its revision must still be
    /// in progress
    async fn check_count_mutable(&self, revizor_id: Uuid, count_id: Uuid) -> AppResult<()> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT r.status
            FROM count_records c
            JOIN revisions r ON r.id = c.revision_id
            WHERE c.id = $1 AND c.revizor_id = $2
            "#,
        )
        .bind(count_id)
        .bind(revizor_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Count record".to_string()))?;

        let status = RevisionStatus::from_str(&row.0)
            .ok_or_else(|| AppError::Internal(format!("Unknown revision status: {}", row.0)))?;
        if status != RevisionStatus::InProgress {
            return Err(AppError::InvalidStateTransition(format!(
                "Counts are locked once the revision is '{}'",
                status.as_str()
            )));
        }
        Ok(())
    }

    async fn check_revision_in_progress(&self, revision_id: Uuid) -> AppResult<()> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM revisions WHERE id = $1")
                .bind(revision_id)
                .fetch_optional(&self.db)
                .await?;

        let status = status.ok_or_else(|| AppError::NotFound("Revision".to_string()))?;
        let status = RevisionStatus::from_str(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown revision status: {}", status)))?;

        if status != RevisionStatus::InProgress {
            return Err(AppError::InvalidStateTransition(format!(
                "Counts can only be entered while in progress, not '{}'",
                status.as_str()
            )));
        }
        Ok(())
    }

    async fn check_assignment(&self, revizor_id: Uuid, revision_id: Uuid) -> AppResult<()> {
        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revision_assignments WHERE revision_id = $1 AND revizor_id = $2)",
        )
        .bind(revision_id)
        .bind(revizor_id)
        .fetch_one(&self.db)
        .await?;

        if !assigned {
            return Err(AppError::Forbidden {
                message: "You are not assigned to this revision".to_string(),
                message_uz: "Siz bu reviziyaga tayinlanmagansiz".to_string(),
            });
        }
        Ok(())
    }
}

type CountViewRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    String,
    NaiveDate,
    Decimal,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn view_from_row(row: CountViewRow) -> CountView {
    CountView {
        id: row.0,
        product_id: row.1,
        product_code: row.2,
        product_name: row.3,
        manufacturer: row.4,
        series: row.5,
        expiry_date: row.6,
        quantity: row.7,
        created_at: row.8,
        updated_at: row.9,
    }
}
