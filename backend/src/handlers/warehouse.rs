//! HTTP handlers for warehouse management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Warehouse;
use crate::middleware::CurrentUser;
use crate::services::warehouse::{
    CreateWarehouseInput, UpdateWarehouseInput, WarehouseService, WarehouseSummary,
};
use crate::AppState;

/// List warehouses of the current administrator
pub async fn list_warehouses(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<WarehouseSummary>>> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    let warehouses = service.list(current_user.0.user_id).await?;
    Ok(Json(warehouses))
}

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    let warehouse = service.create(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// Get one warehouse with its counters
pub async fn get_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<WarehouseSummary>> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    let warehouse = service.get(current_user.0.user_id, warehouse_id).await?;
    Ok(Json(warehouse))
}

/// Update a warehouse
pub async fn update_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    let warehouse = service
        .update(current_user.0.user_id, warehouse_id, input)
        .await?;
    Ok(Json(warehouse))
}

/// Delete a warehouse
pub async fn delete_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    current_user.0.require_admin()?;
    let service = WarehouseService::new(state.db);
    service.delete(current_user.0.user_id, warehouse_id).await?;
    Ok(Json(()))
}
