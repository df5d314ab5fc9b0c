//! Order endpoints: creation, lookup, status, lifecycle, reassignment and
//! outbound transfer.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::OrderStatus,
    services::{
        orders::{CreateOrderRequest, OrderListQuery},
        reassignment::{ReassignItemRequest, ReassignTarget},
    },
    ApiResponse, AppState,
};

use super::request_context;

fn map_status_str(status: &str) -> Result<OrderStatus, ServiceError> {
    match status.to_ascii_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "partially_shipped" | "partiallyshipped" => Ok(OrderStatus::PartiallyShipped),
        "shipped" => Ok(OrderStatus::Shipped),
        "invoiced" => Ok(OrderStatus::Invoiced),
        "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
        other => Err(ServiceError::InvalidStatus(format!(
            "Unknown order status: {other}"
        ))),
    }
}

/// Resolves an order identifier that may be a UUID or an order number.
async fn resolve_order_id(state: &AppState, id: &str) -> Result<Uuid, ServiceError> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }
    if let Some(uuid) = state.services.orders.find_order_id_by_number(id).await? {
        return Ok(uuid);
    }
    Err(ServiceError::NotFound(format!(
        "Order with ID {} not found",
        id
    )))
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let result = state.services.orders.get_order(order_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.orders.list_orders(&query).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    /// Skip the external cancel/close call for transferred orders. Audited.
    #[serde(default)]
    pub force_local: bool,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateStatusBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let ctx = request_context(&headers);
    let new_status = map_status_str(&body.status)?;
    let order = state
        .services
        .order_status
        .update_status(&ctx, order_id, new_status, body.force_local)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[derive(Debug, Deserialize)]
pub struct ReassignBody {
    pub order_item_id: Uuid,
    pub source_group_id: Uuid,
    pub target: ReassignTarget,
    #[serde(default)]
    pub override_window: bool,
}

pub async fn reassign_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ReassignBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let ctx = request_context(&headers);
    let request = ReassignItemRequest {
        order_id,
        order_item_id: body.order_item_id,
        source_group_id: body.source_group_id,
        target: body.target,
        override_window: body.override_window,
    };
    let result = state
        .services
        .reassignment
        .reassign_item(&ctx, request)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn archive_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let ctx = request_context(&headers);
    let order = state
        .services
        .order_status
        .archive_order(&ctx, order_id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn trash_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let ctx = request_context(&headers);
    let order = state
        .services
        .order_status
        .trash_order(&ctx, order_id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let order_id = resolve_order_id(&state, &id).await?;
    let ctx = request_context(&headers);
    state
        .services
        .order_status
        .delete_order_permanently(&ctx, order_id)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted": order_id
    }))))
}

pub async fn transfer_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let transfer = state.services.transfer.clone().ok_or_else(|| {
        ServiceError::SyncFailed("commerce platform not configured".to_string())
    })?;
    let order_id = resolve_order_id(&state, &id).await?;
    let ctx = request_context(&headers);
    let result = transfer.transfer_order(&ctx, order_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct TransferBatchBody {
    pub order_ids: Vec<Uuid>,
}

pub async fn transfer_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TransferBatchBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let transfer = state.services.transfer.clone().ok_or_else(|| {
        ServiceError::SyncFailed("commerce platform not configured".to_string())
    })?;
    let ctx = request_context(&headers);
    let outcome = transfer.transfer_many(&ctx, &body.order_ids).await;
    Ok(Json(ApiResponse::success(outcome)))
}
