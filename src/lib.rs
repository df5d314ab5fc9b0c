//! Wholesale order decomposition and fulfillment reconciliation engine.
//!
//! Carts are decomposed into orders with delivery-window planned shipments,
//! physical shipments are recorded against them, and a configured commerce
//! platform is kept in agreement through outbound transfer and inbound
//! fulfillment reconciliation.

#![forbid(unsafe_code)]

pub mod commerce;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod migrator;
pub mod models;
pub mod order_number;
pub mod services;
pub mod ship_window;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::db::DbPool;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Uniform response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Versioned API routes.
fn api_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route(
            "/:id",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .route("/:id/status", post(handlers::orders::update_status))
        .route("/:id/reassign", post(handlers::orders::reassign_item))
        .route("/:id/archive", post(handlers::orders::archive_order))
        .route("/:id/trash", post(handlers::orders::trash_order))
        .route("/:id/transfer", post(handlers::orders::transfer_order))
        .route("/transfer", post(handlers::orders::transfer_orders));

    let shipments = Router::new()
        .route("/", post(handlers::shipments::record_shipment))
        .route("/:id", put(handlers::shipments::update_shipment))
        .route("/:id/void", post(handlers::shipments::void_shipment));

    let sync = Router::new().route("/run", post(handlers::sync::run_sync));

    Router::new()
        .nest("/orders", orders)
        .nest("/shipments", shipments)
        .nest("/sync", sync)
}

/// Builds the full application router with middleware applied.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
