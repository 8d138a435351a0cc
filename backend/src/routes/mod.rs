//! Route definitions for the Warehouse Revision Management Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - warehouse and ledger management
        .nest("/warehouses", warehouse_routes())
        // Protected routes - product catalog
        .nest("/products", product_routes())
        // Protected routes - revision lifecycle, results and counts
        .nest("/revisions", revision_routes())
        // Protected routes - individual count records
        .nest("/counts", count_routes())
        // Protected routes - revizor assignments
        .nest("/assignments", assignment_routes())
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Warehouse management routes (protected, admin)
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        .route(
            "/:warehouse_id/ledger",
            get(handlers::get_ledger).put(handlers::replace_ledger),
        )
        .route(
            "/:warehouse_id/revisions",
            get(handlers::list_revisions).post(handlers::create_revision),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/search", get(handlers::search_products))
        .route("/:product_id", get(handlers::get_product))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Revision lifecycle routes (protected)
fn revision_routes() -> Router<AppState> {
    Router::new()
        .route("/:revision_id", get(handlers::get_revision))
        .route("/:revision_id/start", post(handlers::start_revision))
        .route("/:revision_id/complete", post(handlers::complete_revision))
        .route(
            "/:revision_id/recalculate",
            post(handlers::recalculate_revision),
        )
        .route("/:revision_id/results", get(handlers::get_revision_results))
        .route(
            "/:revision_id/unaccounted",
            get(handlers::get_unaccounted_items),
        )
        .route(
            "/:revision_id/counts",
            get(handlers::list_my_counts).post(handlers::add_count),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Count record routes (protected, revizor)
fn count_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:count_id",
            put(handlers::update_count).delete(handlers::delete_count),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Assignment routes (protected, revizor)
fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::my_assignments))
        .route(
            "/:assignment_id/complete",
            post(handlers::complete_assignment),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
