//! HTTP layer: thin axum handlers over the service layer.

pub mod health;
pub mod orders;
pub mod shipments;
pub mod sync;

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::{
    commerce::CommercePlatform,
    config::SyncConfig,
    db::DbPool,
    events::EventSender,
    models::RequestContext,
    services::{
        fulfillment::FulfillmentService, order_status::OrderStatusService, orders::OrderService,
        reassignment::ReassignmentService, reconciliation::ReconciliationService,
        transfer::TransferService,
    },
};

/// Fallback actor for requests that carry no identity header.
const DEFAULT_ACTOR: &str = "api";

/// Actor identity header set by the gateway in front of this service.
const ACTOR_HEADER: &str = "x-actor";

/// Service container handed to every handler through [`crate::AppState`].
/// Platform-dependent services are absent when no commerce platform is
/// configured; their endpoints report a sync failure instead of panicking.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub fulfillment: Arc<FulfillmentService>,
    pub reassignment: Arc<ReassignmentService>,
    pub order_status: Arc<OrderStatusService>,
    pub transfer: Option<Arc<TransferService>>,
    pub reconciliation: Option<Arc<ReconciliationService>>,
}

impl AppServices {
    pub fn build(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        platform: Option<Arc<dyn CommercePlatform>>,
        sync_config: SyncConfig,
    ) -> Self {
        let orders = Arc::new(OrderService::new(db.clone(), event_sender.clone()));
        let fulfillment = Arc::new(FulfillmentService::new(
            db.clone(),
            event_sender.clone(),
            platform.clone(),
        ));
        let reassignment = Arc::new(ReassignmentService::new(db.clone(), event_sender.clone()));
        let order_status = Arc::new(OrderStatusService::new(
            db.clone(),
            event_sender.clone(),
            platform.clone(),
        ));
        let transfer = platform.clone().map(|p| {
            Arc::new(TransferService::new(db.clone(), event_sender.clone(), p))
        });
        let reconciliation = platform.map(|p| {
            Arc::new(ReconciliationService::new(
                db,
                event_sender,
                p,
                sync_config,
            ))
        });

        Self {
            orders,
            fulfillment,
            reassignment,
            order_status,
            transfer,
            reconciliation,
        }
    }
}

/// Builds the operator context from request headers.
pub fn request_context(headers: &HeaderMap) -> RequestContext {
    let actor = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_ACTOR);
    RequestContext::new(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn actor_header_is_honored() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(request_context(&headers).actor, "alice");
    }

    #[test]
    fn missing_or_empty_actor_falls_back() {
        assert_eq!(request_context(&HeaderMap::new()).actor, DEFAULT_ACTOR);
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static(""));
        assert_eq!(request_context(&headers).actor, DEFAULT_ACTOR);
    }
}
