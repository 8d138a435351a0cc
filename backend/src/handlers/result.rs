//! HTTP handlers for reconciliation output endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::result::{ResultFilter, ResultService, ResultsResponse, UnaccountedView};
use crate::AppState;

/// List results of a revision with status statistics
pub async fn get_revision_results(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
    Query(filter): Query<ResultFilter>,
) -> AppResult<Json<ResultsResponse>> {
    current_user.0.require_admin()?;
    let service = ResultService::new(state.db);
    let results = service
        .list(current_user.0.user_id, revision_id, filter)
        .await?;
    Ok(Json(results))
}

/// List unaccounted items of a revision
pub async fn get_unaccounted_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(revision_id): Path<Uuid>,
) -> AppResult<Json<Vec<UnaccountedView>>> {
    current_user.0.require_admin()?;
    let service = ResultService::new(state.db);
    let items = service
        .list_unaccounted(current_user.0.user_id, revision_id)
        .await?;
    Ok(Json(items))
}
