//! Manual trigger for the inbound reconciliation pass.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{errors::ServiceError, ApiResponse, AppState};

pub async fn run_sync(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let reconciliation = state.services.reconciliation.clone().ok_or_else(|| {
        ServiceError::SyncFailed("commerce platform not configured".to_string())
    })?;
    let report = reconciliation.run_sync().await?;
    Ok(Json(ApiResponse::success(report)))
}
