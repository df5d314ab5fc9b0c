//! Domain events.
//!
//! Everything outside the transactional boundary (notification dispatch,
//! structured activity logging) hangs off the event channel: services send
//! after commit, fire-and-forget, and the processor loop handles delivery.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::notifications::NotificationService;

/// Events emitted by the engine after a successful local commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderItemReassigned {
        order_id: Uuid,
        order_item_id: Uuid,
        target_group_id: Uuid,
        overridden: bool,
    },
    ShipmentRecorded {
        order_id: Uuid,
        shipment_id: Uuid,
    },
    ShipmentVoided {
        order_id: Uuid,
        shipment_id: Uuid,
    },
    OrderTransferred {
        order_id: Uuid,
        external_id: String,
    },
    FulfillmentReconciled {
        order_id: Uuid,
        shipment_id: Uuid,
        external_fulfillment_id: String,
    },
    OrderArchived(Uuid),
    OrderTrashed(Uuid),
    OrderDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; failures are the caller's to log, never to roll back.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {}", e))
    }
}

/// Builds an event channel with a sized buffer.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Processes events until the channel closes. Notification failures are
/// logged and dropped; the originating operation already committed.
pub async fn process_events(
    mut receiver: mpsc::Receiver<Event>,
    notifications: NotificationService,
) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                if let Err(e) = notifications.send_order_confirmation(*order_id).await {
                    warn!(order_id = %order_id, error = %e, "order confirmation dispatch failed");
                }
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::ShipmentRecorded {
                order_id,
                shipment_id,
            } => {
                if let Err(e) = notifications
                    .send_shipment_notice(*order_id, *shipment_id)
                    .await
                {
                    warn!(order_id = %order_id, error = %e, "shipment notice dispatch failed");
                }
            }
            other => {
                info!(event = ?other, "event processed");
            }
        }
    }
    info!("event channel closed; processor exiting");
}
