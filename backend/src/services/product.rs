//! Product catalog service
//!
//! The catalog is shared across all warehouses. Search accepts Latin
//! queries and matches their Cyrillic transliteration too, since revizors
//! often type on a Latin keyboard while the catalog is stored in Cyrillic.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::Product;
use shared::translit::{contains_latin, transliterate_to_cyrillic};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_product_code, validate_product_name};

use crate::error::{AppError, AppResult};

/// Maximum number of search hits returned to the entry form
const SEARCH_RESULT_LIMIT: i64 = 30;

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub code: String,
    pub name: String,
    pub manufacturer: Option<String>,
}

type ProductRow = (Uuid, String, String, String, DateTime<Utc>);

fn product_from_row(row: ProductRow) -> Product {
    Product {
        id: row.0,
        code: row.1,
        name: row.2,
        manufacturer: row.3,
        created_at: row.4,
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List the catalog ordered by code
    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Product>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, code, name, manufacturer, created_at
            FROM products
            ORDER BY code
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(product_from_row).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Create a catalog product
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        let code = input.code.trim().to_string();
        let name = input.name.trim().to_string();
        let manufacturer = input
            .manufacturer
            .map(|m| m.trim().to_string())
            .unwrap_or_default();

        validate_product_code(&code).map_err(|msg| AppError::Validation {
            field: "code".to_string(),
            message: msg.to_string(),
            message_uz: "Tovar kodi noto'g'ri".to_string(),
        })?;
        validate_product_name(&name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
            message_uz: "Tovar nomi noto'g'ri".to_string(),
        })?;

        // Check if the code is taken
        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE code = $1")
                .bind(&code)
                .fetch_one(&self.db)
                .await?;

        if existing > 0 {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "A product with this code already exists".to_string(),
                message_uz: "Bu kodli tovar allaqachon mavjud".to_string(),
            });
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (code, name, manufacturer)
            VALUES ($1, $2, $3)
            RETURNING id, code, name, manufacturer, created_at
            "#,
        )
        .bind(&code)
        .bind(&name)
        .bind(&manufacturer)
        .fetch_one(&self.db)
        .await?;

        Ok(product_from_row(row))
    }

    /// Get one product
    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, code, name, manufacturer, created_at FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product_from_row(row))
    }

    /// Search by name or code, transliterating Latin queries to Cyrillic
    pub async fn search(&self, query: &str) -> AppResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let raw_pattern = format!("%{}%", query);
        let translit_pattern = if contains_latin(query) {
            format!("%{}%", transliterate_to_cyrillic(query))
        } else {
            raw_pattern.clone()
        };

        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, code, name, manufacturer, created_at
            FROM products
            WHERE name ILIKE $1 OR code ILIKE $1 OR name ILIKE $2 OR code ILIKE $2
            ORDER BY name
            LIMIT $3
            "#,
        )
        .bind(&raw_pattern)
        .bind(&translit_pattern)
        .bind(SEARCH_RESULT_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(product_from_row).collect())
    }
}
