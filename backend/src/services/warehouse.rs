//! Warehouse management service
//!
//! Warehouses are scoped to the administrator who created them; every
//! operation filters by `created_by`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::Warehouse;

use crate::error::{AppError, AppResult};

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    #[validate(length(min = 1, max = 255, message = "Warehouse name must be 1-255 characters"))]
    pub name: String,
    pub address: Option<String>,
}

/// Input for updating a warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 255, message = "Warehouse name must be 1-255 characters"))]
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Warehouse with ledger and revision counters for listings
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseSummary {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    pub ledger_line_count: i64,
    pub revision_count: i64,
}

type WarehouseSummaryRow = (
    Uuid,
    String,
    Option<String>,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
    i64,
    i64,
);

fn summary_from_row(row: WarehouseSummaryRow) -> WarehouseSummary {
    WarehouseSummary {
        warehouse: Warehouse {
            id: row.0,
            name: row.1,
            address: row.2,
            created_by: row.3,
            created_at: row.4,
            updated_at: row.5,
        },
        ledger_line_count: row.6,
        revision_count: row.7,
    }
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List warehouses of an administrator, newest first
    pub async fn list(&self, admin_id: Uuid) -> AppResult<Vec<WarehouseSummary>> {
        let rows = sqlx::query_as::<_, WarehouseSummaryRow>(
            r#"
            SELECT w.id, w.name, w.address, w.created_by, w.created_at, w.updated_at,
                   (SELECT COUNT(*) FROM ledger_lines l WHERE l.warehouse_id = w.id) AS ledger_line_count,
                   (SELECT COUNT(*) FROM revisions r WHERE r.warehouse_id = w.id) AS revision_count
            FROM warehouses w
            WHERE w.created_by = $1
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(admin_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(summary_from_row).collect())
    }

    /// Create a warehouse
    pub async fn create(&self, admin_id: Uuid, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let row = sqlx::query_as::<_, (Uuid, String, Option<String>, Uuid, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            INSERT INTO warehouses (name, address, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, address, created_by, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.address)
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(warehouse_id = %row.0, "warehouse created");

        Ok(Warehouse {
            id: row.0,
            name: row.1,
            address: row.2,
            created_by: row.3,
            created_at: row.4,
            updated_at: row.5,
        })
    }

    /// Get one warehouse with its counters
    pub async fn get(&self, admin_id: Uuid, warehouse_id: Uuid) -> AppResult<WarehouseSummary> {
        let row = sqlx::query_as::<_, WarehouseSummaryRow>(
            r#"
            SELECT w.id, w.name, w.address, w.created_by, w.created_at, w.updated_at,
                   (SELECT COUNT(*) FROM ledger_lines l WHERE l.warehouse_id = w.id) AS ledger_line_count,
                   (SELECT COUNT(*) FROM revisions r WHERE r.warehouse_id = w.id) AS revision_count
            FROM warehouses w
            WHERE w.id = $1 AND w.created_by = $2
            "#,
        )
        .bind(warehouse_id)
        .bind(admin_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(summary_from_row(row))
    }

    /// Update name and address
    pub async fn update(
        &self,
        admin_id: Uuid,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> AppResult<Warehouse> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let existing = self.get(admin_id, warehouse_id).await?.warehouse;
        let name = input.name.unwrap_or(existing.name);
        let address = match input.address {
            Some(address) => Some(address),
            None => existing.address,
        };

        let row = sqlx::query_as::<_, (Uuid, String, Option<String>, Uuid, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            UPDATE warehouses
            SET name = $1, address = $2, updated_at = NOW()
            WHERE id = $3 AND created_by = $4
            RETURNING id, name, address, created_by, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&address)
        .bind(warehouse_id)
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        Ok(Warehouse {
            id: row.0,
            name: row.1,
            address: row.2,
            created_by: row.3,
            created_at: row.4,
            updated_at: row.5,
        })
    }

    /// Delete a warehouse and everything attached to it
    pub async fn delete(&self, admin_id: Uuid, warehouse_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1 AND created_by = $2")
            .bind(warehouse_id)
            .bind(admin_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        tracing::info!(%warehouse_id, "warehouse deleted");
        Ok(())
    }
}
