//! Shipment endpoints: recording, corrections and voiding.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::fulfillment::{RecordShipmentRequest, UpdateShipmentRequest},
    ApiResponse, AppState,
};

use super::request_context;

pub async fn record_shipment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RecordShipmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let ctx = request_context(&headers);
    let result = state
        .services
        .fulfillment
        .record_shipment(&ctx, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

pub async fn void_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let ctx = request_context(&headers);
    let order_status = state.services.fulfillment.void_shipment(&ctx, id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "shipment_id": id,
        "order_status": order_status,
    }))))
}

pub async fn update_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<UpdateShipmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let ctx = request_context(&headers);
    let shipment = state
        .services
        .fulfillment
        .update_shipment(&ctx, id, request)
        .await?;
    Ok(Json(ApiResponse::success(shipment)))
}
