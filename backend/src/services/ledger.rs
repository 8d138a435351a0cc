//! Expected-stock ledger service
//!
//! The ledger of a warehouse is replaced wholesale from typed entries
//! (parsing and encoding detection of the accounting export happen
//! upstream). Entries that fail validation are skipped and reported back
//! as warnings, never fatal. The whole replace runs in one transaction and
//! is rejected while a revision of the warehouse is in progress.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use shared::validation::{normalize_series, validate_ledger_quantity, validate_series};

use crate::error::{AppError, AppResult};

/// Ledger service
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// One typed ledger entry from the upload collaborator
#[derive(Debug, Deserialize)]
pub struct LedgerEntryInput {
    pub product_id: Uuid,
    pub series: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
}

/// Input for replacing the ledger of a warehouse
#[derive(Debug, Deserialize)]
pub struct ReplaceLedgerInput {
    pub entries: Vec<LedgerEntryInput>,
}

/// Outcome of a ledger replace: skipped entries become warnings
#[derive(Debug, Serialize)]
pub struct LedgerReplaceReport {
    pub inserted: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Ledger line joined with its product for listings
#[derive(Debug, Serialize)]
pub struct LedgerLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub manufacturer: String,
    pub series: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List the ledger of a warehouse
    pub async fn list(&self, admin_id: Uuid, warehouse_id: Uuid) -> AppResult<Vec<LedgerLineView>> {
        self.check_warehouse(admin_id, warehouse_id).await?;

        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                String,
                String,
                String,
                String,
                Option<NaiveDate>,
                Decimal,
            ),
        >(
            r#"
            SELECT l.id, l.product_id, p.code, p.name, p.manufacturer,
                   l.series, l.expiry_date, l.quantity
            FROM ledger_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.warehouse_id = $1
            ORDER BY p.name, l.series, l.expiry_date
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LedgerLineView {
                id: r.0,
                product_id: r.1,
                product_code: r.2,
                product_name: r.3,
                manufacturer: r.4,
                series: r.5,
                expiry_date: r.6,
                quantity: r.7,
            })
            .collect())
    }

    /// Replace the whole ledger of a warehouse from typed entries
    pub async fn replace(
        &self,
        admin_id: Uuid,
        warehouse_id: Uuid,
        input: ReplaceLedgerInput,
    ) -> AppResult<LedgerReplaceReport> {
        self.check_warehouse(admin_id, warehouse_id).await?;

        // The ledger is locked once a revision is running
        let in_progress = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revisions WHERE warehouse_id = $1 AND status = 'in_progress')",
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if in_progress {
            return Err(AppError::Conflict {
                resource: "ledger".to_string(),
                message: "Ledger is locked while a revision is in progress".to_string(),
                message_uz: "Reviziya davomida qoldiqlarni o'zgartirib bo'lmaydi".to_string(),
            });
        }

        // Known products, for skip-and-warn validation
        let product_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM products")
            .fetch_all(&self.db)
            .await?;
        let known_products: HashSet<Uuid> = product_ids.into_iter().collect();

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM ledger_lines WHERE warehouse_id = $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0usize;
        let mut skipped = 0usize;
        let mut warnings = Vec::new();
        let mut seen_keys: HashSet<(Uuid, String, Option<NaiveDate>)> = HashSet::new();

        for (index, entry) in input.entries.iter().enumerate() {
            let row_no = index + 1;
            let series = normalize_series(entry.series.as_deref());

            if !known_products.contains(&entry.product_id) {
                warnings.push(format!("row {}: unknown product {}", row_no, entry.product_id));
                skipped += 1;
                continue;
            }
            if let Err(msg) = validate_ledger_quantity(entry.quantity) {
                warnings.push(format!("row {}: {}", row_no, msg));
                skipped += 1;
                continue;
            }
            if let Err(msg) = validate_series(&series) {
                warnings.push(format!("row {}: {}", row_no, msg));
                skipped += 1;
                continue;
            }
            if !seen_keys.insert((entry.product_id, series.clone(), entry.expiry_date)) {
                warnings.push(format!(
                    "row {}: duplicate of an earlier entry for the same product/series/expiry",
                    row_no
                ));
                skipped += 1;
                continue;
            }

            sqlx::query(
                r#"
                INSERT INTO ledger_lines (warehouse_id, product_id, series, expiry_date, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(warehouse_id)
            .bind(entry.product_id)
            .bind(&series)
            .bind(entry.expiry_date)
            .bind(entry.quantity)
            .execute(&mut *tx)
            .await?;

            inserted += 1;
        }

        tx.commit().await?;

        if skipped > 0 {
            tracing::warn!(%warehouse_id, inserted, skipped, "ledger replaced with skipped rows");
        } else {
            tracing::info!(%warehouse_id, inserted, "ledger replaced");
        }

        Ok(LedgerReplaceReport {
            inserted,
            skipped,
            warnings,
        })
    }

    /// Validate warehouse ownership
    async fn check_warehouse(&self, admin_id: Uuid, warehouse_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1 AND created_by = $2)",
        )
        .bind(warehouse_id)
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }
        Ok(())
    }
}
