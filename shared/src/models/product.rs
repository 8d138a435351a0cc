//! Product catalog model
//!
//! The catalog is shared across all warehouses; ledger lines and count
//! records reference products by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// External code from the accounting system, unique
    pub code: String,
    pub name: String,
    pub manufacturer: String,
    pub created_at: DateTime<Utc>,
}
