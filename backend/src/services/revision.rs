//! Revision (audit cycle) lifecycle service
//!
//! The lifecycle is pending -> in_progress -> completed. Transitions are
//! race-safe: the revision row is locked (`FOR UPDATE`) before any check,
//! so concurrently finishing revizors serialize and the engine runs exactly
//! once at the completion transition, inside the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use shared::models::{AssignmentStatus, Revision, RevisionStatus};

use crate::error::{AppError, AppResult};
use crate::services::reconciliation::{self, EngineRunSummary};

/// Revision lifecycle service
#[derive(Clone)]
pub struct RevisionService {
    db: PgPool,
}

/// Input for creating a revision
#[derive(Debug, Deserialize)]
pub struct CreateRevisionInput {
    pub revizor_ids: Vec<Uuid>,
}

/// Assignment joined with the revizor's name
#[derive(Debug, Serialize)]
pub struct AssignmentView {
    pub id: Uuid,
    pub revizor_id: Uuid,
    pub revizor_name: String,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Revision with its assignments for the admin detail view
#[derive(Debug, Serialize)]
pub struct RevisionDetail {
    #[serde(flatten)]
    pub revision: Revision,
    pub warehouse_name: String,
    pub assignments: Vec<AssignmentView>,
    pub count_record_count: i64,
}

/// One row of the revizor dashboard
#[derive(Debug, Serialize)]
pub struct MyAssignment {
    pub id: Uuid,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub revision_id: Uuid,
    pub revision_number: i32,
    pub revision_status: RevisionStatus,
    pub warehouse_name: String,
}

/// Outcome of a revizor finishing their assignment
#[derive(Debug, Serialize)]
pub struct AssignmentCompletionOutcome {
    /// True when this was the last open assignment and the revision
    /// completed (and the engine ran) as part of the same transaction
    pub revision_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineRunSummary>,
}

type RevisionRow = (
    Uuid,
    Uuid,
    i32,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Uuid,
    DateTime<Utc>,
);

fn revision_from_row(row: RevisionRow) -> AppResult<Revision> {
    let status = RevisionStatus::from_str(&row.3)
        .ok_or_else(|| AppError::Internal(format!("Unknown revision status: {}", row.3)))?;
    Ok(Revision {
        id: row.0,
        warehouse_id: row.1,
        revision_number: row.2,
        status,
        started_at: row.4,
        completed_at: row.5,
        created_by: row.6,
        created_at: row.7,
    })
}

fn parse_assignment_status(s: &str) -> AppResult<AssignmentStatus> {
    AssignmentStatus::from_str(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown assignment status: {}", s)))
}

impl RevisionService {
    /// Create a new RevisionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a revision with its assigned revizors
    pub async fn create(
        &self,
        admin_id: Uuid,
        warehouse_id: Uuid,
        input: CreateRevisionInput,
    ) -> AppResult<RevisionDetail> {
        self.check_warehouse(admin_id, warehouse_id).await?;

        // Dedupe while keeping the submitted order
        let mut seen = HashSet::new();
        let revizor_ids: Vec<Uuid> = input
            .revizor_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        if revizor_ids.is_empty() {
            return Err(AppError::Validation {
                field: "revizor_ids".to_string(),
                message: "At least one revizor must be assigned".to_string(),
                message_uz: "Kamida bitta revizor tanlang".to_string(),
            });
        }

        let valid_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE id = ANY($1) AND role = 'revizor' AND is_active = true",
        )
        .bind(&revizor_ids)
        .fetch_one(&self.db)
        .await?;

        if valid_count as usize != revizor_ids.len() {
            return Err(AppError::Validation {
                field: "revizor_ids".to_string(),
                message: "All assigned users must be active revizors".to_string(),
                message_uz: "Barcha tayinlanganlar faol revizor bo'lishi kerak".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let next_number: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(revision_number), 0) + 1 FROM revisions WHERE warehouse_id = $1",
        )
        .bind(warehouse_id)
        .fetch_one(&mut *tx)
        .await?;

        let revision_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO revisions (warehouse_id, revision_number, status, created_by)
            VALUES ($1, $2, 'pending', $3)
            RETURNING id
            "#,
        )
        .bind(warehouse_id)
        .bind(next_number)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        for revizor_id in &revizor_ids {
            sqlx::query(
                "INSERT INTO revision_assignments (revision_id, revizor_id) VALUES ($1, $2)",
            )
            .bind(revision_id)
            .bind(revizor_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(%revision_id, revision_number = next_number, "revision created");

        self.get(admin_id, revision_id).await
    }

    /// List revisions of a warehouse, newest first
    pub async fn list(&self, admin_id: Uuid, warehouse_id: Uuid) -> AppResult<Vec<Revision>> {
        self.check_warehouse(admin_id, warehouse_id).await?;

        let rows = sqlx::query_as::<_, RevisionRow>(
            r#"
            SELECT id, warehouse_id, revision_number, status, started_at, completed_at,
                   created_by, created_at
            FROM revisions
            WHERE warehouse_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(revision_from_row).collect()
    }

    /// Get one revision with its assignments
    pub async fn get(&self, admin_id: Uuid, revision_id: Uuid) -> AppResult<RevisionDetail> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, i32, String, Option<DateTime<Utc>>, Option<DateTime<Utc>>, Uuid, DateTime<Utc>, String)>(
            r#"
            SELECT r.id, r.warehouse_id, r.revision_number, r.status, r.started_at,
                   r.completed_at, r.created_by, r.created_at, w.name
            FROM revisions r
            JOIN warehouses w ON w.id = r.warehouse_id
            WHERE r.id = $1 AND w.created_by = $2
            "#,
        )
        .bind(revision_id)
        .bind(admin_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Revision".to_string()))?;

        let warehouse_name = row.8.clone();
        let revision = revision_from_row((
            row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7,
        ))?;

        let assignment_rows = sqlx::query_as::<
            _,
            (Uuid, Uuid, String, String, DateTime<Utc>, Option<DateTime<Utc>>),
        >(
            r#"
            SELECT a.id, a.revizor_id, u.full_name, a.status, a.assigned_at, a.completed_at
            FROM revision_assignments a
            JOIN users u ON u.id = a.revizor_id
            WHERE a.revision_id = $1
            ORDER BY a.assigned_at
            "#,
        )
        .bind(revision_id)
        .fetch_all(&self.db)
        .await?;

        let mut assignments = Vec::with_capacity(assignment_rows.len());
        for a in assignment_rows {
            assignments.push(AssignmentView {
                id: a.0,
                revizor_id: a.1,
                revizor_name: a.2,
                status: parse_assignment_status(&a.3)?,
                assigned_at: a.4,
                completed_at: a.5,
            });
        }

        let count_record_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM count_records WHERE revision_id = $1")
                .bind(revision_id)
                .fetch_one(&self.db)
                .await?;

        Ok(RevisionDetail {
            revision,
            warehouse_name,
            assignments,
            count_record_count,
        })
    }

    /// Start a pending revision; assignments move to working
    pub async fn start(&self, admin_id: Uuid, revision_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let status = self.lock_revision(&mut tx, admin_id, revision_id).await?.0;
        if !status.can_transition_to(RevisionStatus::InProgress) {
            return Err(AppError::InvalidStateTransition(format!(
                "Revision cannot be started from status '{}'",
                status.as_str()
            )));
        }

        sqlx::query(
            "UPDATE revisions SET status = 'in_progress', started_at = NOW() WHERE id = $1",
        )
        .bind(revision_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE revision_assignments SET status = 'working' WHERE revision_id = $1 AND status = 'assigned'",
        )
        .bind(revision_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%revision_id, "revision started");
        Ok(())
    }

    /// Complete an in-progress revision (admin override) and run the engine
    pub async fn complete(&self, admin_id: Uuid, revision_id: Uuid) -> AppResult<EngineRunSummary> {
        let mut tx = self.db.begin().await?;

        let (status, warehouse_id) = self.lock_revision(&mut tx, admin_id, revision_id).await?;
        if !status.can_transition_to(RevisionStatus::Completed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Revision cannot be completed from status '{}'",
                status.as_str()
            )));
        }

        sqlx::query("UPDATE revisions SET status = 'completed', completed_at = NOW() WHERE id = $1")
            .bind(revision_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE revision_assignments
            SET status = 'completed', completed_at = NOW()
            WHERE revision_id = $1 AND status <> 'completed'
            "#,
        )
        .bind(revision_id)
        .execute(&mut *tx)
        .await?;

        let summary =
            reconciliation::recalculate_revision(&mut tx, revision_id, warehouse_id).await?;

        tx.commit().await?;

        tracing::info!(%revision_id, "revision completed by admin");
        Ok(summary)
    }

    /// Re-run the engine while the revision is still in progress.
    ///
    /// Does not change the phase; derived rows are replaced in place.
    pub async fn recalculate(
        &self,
        admin_id: Uuid,
        revision_id: Uuid,
    ) -> AppResult<EngineRunSummary> {
        let mut tx = self.db.begin().await?;

        let (status, warehouse_id) = self.lock_revision(&mut tx, admin_id, revision_id).await?;
        if status != RevisionStatus::InProgress {
            return Err(AppError::InvalidStateTransition(format!(
                "Results can only be recalculated while in progress, not '{}'",
                status.as_str()
            )));
        }

        let summary =
            reconciliation::recalculate_revision(&mut tx, revision_id, warehouse_id).await?;

        tx.commit().await?;
        Ok(summary)
    }

    /// List the active assignments of a revizor
    pub async fn list_my_assignments(&self, revizor_id: Uuid) -> AppResult<Vec<MyAssignment>> {
        let rows = sqlx::query_as::<
            _,
            (Uuid, String, DateTime<Utc>, Uuid, i32, String, String),
        >(
            r#"
            SELECT a.id, a.status, a.assigned_at, r.id, r.revision_number, r.status, w.name
            FROM revision_assignments a
            JOIN revisions r ON r.id = a.revision_id
            JOIN warehouses w ON w.id = r.warehouse_id
            WHERE a.revizor_id = $1 AND a.status IN ('assigned', 'working')
            ORDER BY a.assigned_at DESC
            "#,
        )
        .bind(revizor_id)
        .fetch_all(&self.db)
        .await?;

        let mut assignments = Vec::with_capacity(rows.len());
        for row in rows {
            assignments.push(MyAssignment {
                id: row.0,
                status: parse_assignment_status(&row.1)?,
                assigned_at: row.2,
                revision_id: row.3,
                revision_number: row.4,
                revision_status: RevisionStatus::from_str(&row.5).ok_or_else(|| {
                    AppError::Internal(format!("Unknown revision status: {}", row.5))
                })?,
                warehouse_name: row.6,
            });
        }
        Ok(assignments)
    }

    /// Mark the revizor's own assignment completed.
    ///
    /// When this closes the last open assignment the revision flips to
    /// completed and the engine runs, all inside the same transaction. The
    /// revision row is locked up front, so of several revizors finishing
    /// concurrently exactly one observes "no assignments left" and triggers
    /// the single engine run.
    pub async fn complete_assignment(
        &self,
        revizor_id: Uuid,
        assignment_id: Uuid,
    ) -> AppResult<AssignmentCompletionOutcome> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (Uuid, String, Uuid, String, Uuid)>(
            r#"
            SELECT a.id, a.status, r.id, r.status, r.warehouse_id
            FROM revision_assignments a
            JOIN revisions r ON r.id = a.revision_id
            WHERE a.id = $1 AND a.revizor_id = $2
            FOR UPDATE
            "#,
        )
        .bind(assignment_id)
        .bind(revizor_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment".to_string()))?;

        let (_, assignment_status, revision_id, revision_status, warehouse_id) = row;

        if parse_assignment_status(&assignment_status)? == AssignmentStatus::Completed {
            return Err(AppError::Conflict {
                resource: "assignment".to_string(),
                message: "Assignment is already completed".to_string(),
                message_uz: "Siz allaqachon tugatgansiz".to_string(),
            });
        }

        let revision_status = RevisionStatus::from_str(&revision_status).ok_or_else(|| {
            AppError::Internal(format!("Unknown revision status: {}", revision_status))
        })?;
        if revision_status != RevisionStatus::InProgress {
            return Err(AppError::InvalidStateTransition(format!(
                "Counts can only be finished while in progress, not '{}'",
                revision_status.as_str()
            )));
        }

        sqlx::query(
            "UPDATE revision_assignments SET status = 'completed', completed_at = NOW() WHERE id = $1",
        )
        .bind(assignment_id)
        .execute(&mut *tx)
        .await?;

        let open_assignments: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM revision_assignments WHERE revision_id = $1 AND status <> 'completed'",
        )
        .bind(revision_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut outcome = AssignmentCompletionOutcome {
            revision_completed: false,
            engine: None,
        };

        if open_assignments == 0 {
            // Status-guarded update: only one transition can win
            let completed: Option<Uuid> = sqlx::query_scalar(
                r#"
                UPDATE revisions
                SET status = 'completed', completed_at = NOW()
                WHERE id = $1 AND status = 'in_progress'
                RETURNING id
                "#,
            )
            .bind(revision_id)
            .fetch_optional(&mut *tx)
            .await?;

            if completed.is_some() {
                let summary =
                    reconciliation::recalculate_revision(&mut tx, revision_id, warehouse_id)
                        .await?;
                outcome.revision_completed = true;
                outcome.engine = Some(summary);
                tracing::info!(%revision_id, "last assignment finished, revision completed");
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Lock a revision row for the rest of the transaction and return its
    /// current status and warehouse
    async fn lock_revision(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        admin_id: Uuid,
        revision_id: Uuid,
    ) -> AppResult<(RevisionStatus, Uuid)> {
        let row = sqlx::query_as::<_, (String, Uuid)>(
            r#"
            SELECT r.status, r.warehouse_id
            FROM revisions r
            JOIN warehouses w ON w.id = r.warehouse_id
            WHERE r.id = $1 AND w.created_by = $2
            FOR UPDATE OF r
            "#,
        )
        .bind(revision_id)
        .bind(admin_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Revision".to_string()))?;

        let status = RevisionStatus::from_str(&row.0)
            .ok_or_else(|| AppError::Internal(format!("Unknown revision status: {}", row.0)))?;
        Ok((status, row.1))
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
