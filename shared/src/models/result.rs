//! Derived reconciliation output models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of comparing counted stock against the ledger for one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Correct,
    Shortage,
    Excess,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Correct => "correct",
            ResultStatus::Shortage => "shortage",
            ResultStatus::Excess => "excess",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "correct" => Some(ResultStatus::Correct),
            "shortage" => Some(ResultStatus::Shortage),
            "excess" => Some(ResultStatus::Excess),
            _ => None,
        }
    }

    /// Status implied by a signed difference (actual - expected)
    pub fn from_difference(difference: Decimal) -> Self {
        if difference.is_zero() {
            ResultStatus::Correct
        } else if difference < Decimal::ZERO {
            ResultStatus::Shortage
        } else {
            ResultStatus::Excess
        }
    }
}

/// One derived result line of a completed (or recalculated) revision.
///
/// Rows are recomputed wholesale on every engine run; they are never
/// updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionResult {
    pub id: Uuid,
    pub revision_id: Uuid,
    pub product_id: Uuid,
    pub series: String,
    pub expiry_date: Option<NaiveDate>,
    pub expected_quantity: Decimal,
    pub actual_quantity: Decimal,
    pub difference: Decimal,
    pub status: ResultStatus,
    pub calculated_at: DateTime<Utc>,
}

/// Counted stock with no matching ledger entry for its product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaccountedItem {
    pub id: Uuid,
    pub revision_id: Uuid,
    pub product_id: Uuid,
    pub series: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
    pub revizor_id: Uuid,
    pub created_at: DateTime<Utc>,
}
