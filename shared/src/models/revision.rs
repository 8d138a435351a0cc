//! Revision (audit cycle) models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionStatus {
    Pending,
    InProgress,
    Completed,
}

impl RevisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionStatus::Pending => "pending",
            RevisionStatus::InProgress => "in_progress",
            RevisionStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RevisionStatus::Pending),
            "in_progress" => Some(RevisionStatus::InProgress),
            "completed" => Some(RevisionStatus::Completed),
            _ => None,
        }
    }

    /// Whether a transition to `next` is allowed.
    ///
    /// The lifecycle is strictly forward: pending -> in_progress -> completed.
    pub fn can_transition_to(&self, next: RevisionStatus) -> bool {
        matches!(
            (self, next),
            (RevisionStatus::Pending, RevisionStatus::InProgress)
                | (RevisionStatus::InProgress, RevisionStatus::Completed)
        )
    }
}

/// Status of one revizor's assignment within a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Working,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Working => "working",
            AssignmentStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(AssignmentStatus::Assigned),
            "working" => Some(AssignmentStatus::Working),
            "completed" => Some(AssignmentStatus::Completed),
            _ => None,
        }
    }
}

/// One audit cycle over a warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    /// Sequential number within the warehouse, starting at 1
    pub revision_number: i32,
    pub status: RevisionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A revizor assigned to a revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionAssignment {
    pub id: Uuid,
    pub revision_id: Uuid,
    pub revizor_id: Uuid,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One counted-quantity record submitted by a revizor.
///
/// Records are unique per (revision, revizor, product, series, expiry_date);
/// submitting the same key again adds to the stored quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountRecord {
    pub id: Uuid,
    pub revision_id: Uuid,
    pub revizor_id: Uuid,
    pub product_id: Uuid,
    pub series: String,
    pub expiry_date: NaiveDate,
    /// Counted quantity, always positive
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RevisionStatus::Pending,
            RevisionStatus::InProgress,
            RevisionStatus::Completed,
        ] {
            assert_eq!(RevisionStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_valid_transitions() {
        assert!(RevisionStatus::Pending.can_transition_to(RevisionStatus::InProgress));
        assert!(RevisionStatus::InProgress.can_transition_to(RevisionStatus::Completed));
    }

    #[test]
    fn test_invalid_transitions() {
        // No skipping, no going backwards, no leaving the terminal state
        assert!(!RevisionStatus::Pending.can_transition_to(RevisionStatus::Completed));
        assert!(!RevisionStatus::InProgress.can_transition_to(RevisionStatus::Pending));
        assert!(!RevisionStatus::Completed.can_transition_to(RevisionStatus::InProgress));
        assert!(!RevisionStatus::Completed.can_transition_to(RevisionStatus::Pending));
    }

    #[test]
    fn test_assignment_status_round_trip() {
        for status in [
            AssignmentStatus::Assigned,
            AssignmentStatus::Working,
            AssignmentStatus::Completed,
        ] {
            assert_eq!(AssignmentStatus::from_str(status.as_str()), Some(status));
        }
    }
}
