//! Expected-stock ledger model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One expected-stock line uploaded from the external accounting system.
///
/// A line is keyed by (warehouse, product, series, expiry_date); the ledger
/// of a warehouse is replaced wholesale on re-upload and is immutable while
/// a revision of that warehouse is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLine {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    /// Batch series, empty when the source had none
    pub series: String,
    pub expiry_date: Option<NaiveDate>,
    /// Expected quantity, non-negative
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
}
