use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Error body returned by the HTTP surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Conflict").
    pub error: String,
    /// Human-readable error description.
    pub message: String,
    /// Additional detail (offending window, unresolved SKU list).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// ISO 8601 timestamp when the error occurred.
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A planned shipment's dates fall outside its delivery window. Carries
    /// the first offending window and a before/after-bound reason so callers
    /// can render (or override) the exact violation.
    #[error("Ship window violation for \"{window}\": {reason}")]
    WindowViolation { window: String, reason: String },

    /// Line items that could not be resolved to external catalog references.
    /// Always the complete list; reported before any external call is made.
    #[error("Unresolved SKUs: {}", .0.join(", "))]
    UnresolvedSkus(Vec<String>),

    /// Editing a terminal order, moving an item not in its stated source
    /// group, and similar stale-client conditions. Distinct from validation
    /// so callers can disable retries.
    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Order {0} has already been transferred")]
    AlreadyTransferred(Uuid),

    /// An external cancel/close/transfer call failed. Local state was left
    /// untouched; the caller decides whether to retry or force a local-only
    /// change.
    #[error("External sync failed: {0}")]
    SyncFailed(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Invalid status transition: {0}")]
    InvalidStatus(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_)
            | ServiceError::WindowViolation { .. }
            | ServiceError::UnresolvedSkus(_)
            | ServiceError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            ServiceError::StateConflict(_) | ServiceError::AlreadyTransferred(_) => {
                StatusCode::CONFLICT
            }
            ServiceError::SyncFailed(_) | ServiceError::ExternalServiceError(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServiceError::WindowViolation { window, reason } => {
                Some(json!({ "window": window, "reason": reason }))
            }
            ServiceError::UnresolvedSkus(skus) => Some(json!({ "unresolved_skus": skus })),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: self.to_string(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
