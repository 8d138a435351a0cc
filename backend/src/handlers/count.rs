//! HTTP handlers for count capture endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::count::{
    AddCountInput, CountService, CountView, MyCountsResponse, UpdateCountInput,
};
use crate::AppState;

/// Submit a count for a revision (same key accumulates)
pub async fn add_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
    Json(input): Json<AddCountInput>,
) -> AppResult<(StatusCode, Json<CountView>)> {
    current_user.0.require_revizor()?;
    let service = CountService::new(state.db);
    let count = service
        .add(current_user.0.user_id, revision_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(count)))
}

/// List the current revizor's counts for a revision
pub async fn list_my_counts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
) -> AppResult<Json<MyCountsResponse>> {
    current_user.0.require_revizor()?;
    let service = CountService::new(state.db);
    let counts = service
        .list_mine(current_user.0.user_id, revision_id)
        .await?;
    Ok(Json(counts))
}

/// Set an absolute quantity on an owned count record
pub async fn update_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(count_id): Path<Uuid>,
    Json(input): Json<UpdateCountInput>,
) -> AppResult<Json<CountView>> {
    current_user.0.require_revizor()?;
    let service = CountService::new(state.db);
    let count = service
        .update(current_user.0.user_id, count_id, input)
        .await?;
    Ok(Json(count))
}

/// Delete an owned count record
pub async fn delete_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(count_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require_revizor()?;
    let service = CountService::new(state.db);
    service.delete(current_user.0.user_id, count_id).await?;
    Ok(Json(()))
}
