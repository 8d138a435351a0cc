//! HTTP handlers for revision lifecycle and assignment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Revision;
use crate::middleware::CurrentUser;
use crate::services::reconciliation::EngineRunSummary;
use crate::services::revision::{
    AssignmentCompletionOutcome, CreateRevisionInput, MyAssignment, RevisionDetail,
    RevisionService,
};
use crate::AppState;

/// List revisions of a warehouse
pub async fn list_revisions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<Revision>>> {
    current_user.0.require_admin()?;
    let service = RevisionService::new(state.db);
    let revisions = service.list(current_user.0.user_id, warehouse_id).await?;
    Ok(Json(revisions))
}

/// Create a revision with its assigned revizors
pub async fn create_revision(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<CreateRevisionInput>,
) -> AppResult<(StatusCode, Json<RevisionDetail>)> {
    current_user.0.require_admin()?;
    let service = RevisionService::new(state.db);
    let revision = service
        .create(current_user.0.user_id, warehouse_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(revision)))
}

/// Get one revision with its assignments
pub async fn get_revision(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
) -> AppResult<Json<RevisionDetail>> {
    current_user.0.require_admin()?;
    let service = RevisionService::new(state.db);
    let revision = service.get(current_user.0.user_id, revision_id).await?;
    Ok(Json(revision))
}

/// Start a pending revision
pub async fn start_revision(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
) -> AppResult<Json<RevisionDetail>> {
    current_user.0.require_admin()?;
    let service = RevisionService::new(state.db);
    service.start(current_user.0.user_id, revision_id).await?;
    let revision = service.get(current_user.0.user_id, revision_id).await?;
    Ok(Json(revision))
}

/// Complete an in-progress revision and run the reconciliation engine
pub async fn complete_revision(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
) -> AppResult<Json<EngineRunSummary>> {
    current_user.0.require_admin()?;
    let service = RevisionService::new(state.db);
    let summary = service.complete(current_user.0.user_id, revision_id).await?;
    Ok(Json(summary))
}

/// Re-run the engine while the revision is still in progress
pub async fn recalculate_revision(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
) -> AppResult<Json<EngineRunSummary>> {
    current_user.0.require_admin()?;
    let service = RevisionService::new(state.db);
    let summary = service
        .recalculate(current_user.0.user_id, revision_id)
        .await?;
    Ok(Json(summary))
}

/// List the current revizor's active assignments
pub async fn my_assignments(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MyAssignment>>> {
    current_user.0.require_revizor()?;
    let service = RevisionService::new(state.db);
    let assignments = service.list_my_assignments(current_user.0.user_id).await?;
    Ok(Json(assignments))
}

/// Finish the current revizor's own assignment
pub async fn complete_assignment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<Json<AssignmentCompletionOutcome>> {
    current_user.0.require_revizor()?;
    let service = RevisionService::new(state.db);
    let outcome = service
        .complete_assignment(current_user.0.user_id, assignment_id)
        .await?;
    Ok(Json(outcome))
}
