//! HTTP handlers for the expected-stock ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::{
    LedgerLineView, LedgerReplaceReport, LedgerService, ReplaceLedgerInput,
};
use crate::AppState;

/// List the ledger of a warehouse
pub async fn get_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<LedgerLineView>>> {
    current_user.0.require_admin()?;
    let service = LedgerService::new(state.db);
    let lines = service.list(current_user.0.user_id, warehouse_id).await?;
    Ok(Json(lines))
}

/// Replace the whole ledger of a warehouse from typed entries
pub async fn replace_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<ReplaceLedgerInput>,
) -> AppResult<Json<LedgerReplaceReport>> {
    current_user.0.require_admin()?;
    let service = LedgerService::new(state.db);
    let report = service
        .replace(current_user.0.user_id, warehouse_id, input)
        .await?;
    Ok(Json(report))
}
