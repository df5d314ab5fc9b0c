//! Order status state machine and archival lifecycle.
//!
//! `Pending → {PartiallyShipped, Shipped} → Invoiced`, with `Cancelled`
//! reachable from any non-terminal state. Terminal orders are frozen; they
//! move instead through `active → archived → trashed → permanent removal`.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    commerce::{types::ExternalOrderState, CommercePlatform},
    db::DbPool,
    entities::{
        audit_log,
        order::{self, Entity as OrderEntity},
        order_item, planned_shipment, shipment,
        shipment_item, shipment_tracking,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderLifecycle, OrderStatus, RequestContext},
    services::BatchOutcome,
};

/// Whether a direct transition between two statuses is legal.
pub fn transition_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, PartiallyShipped)
            | (Pending, Shipped)
            | (PartiallyShipped, Shipped)
            | (Shipped, PartiallyShipped)
            | (PartiallyShipped, Invoiced)
            | (Shipped, Invoiced)
            | (Pending, Cancelled)
            | (PartiallyShipped, Cancelled)
            | (Shipped, Cancelled)
    )
}

#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
    platform: Option<Arc<dyn CommercePlatform>>,
}

impl OrderStatusService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        platform: Option<Arc<dyn CommercePlatform>>,
    ) -> Self {
        Self {
            db,
            event_sender,
            platform,
        }
    }

    /// Transitions an order's status. Cancelling or invoicing a transferred
    /// order first issues the matching external cancel/close call; if that
    /// call fails the local status stays untouched and the failure surfaces
    /// as a sync error, so the caller can retry or pass `force_local`.
    /// Forced local changes on transferred orders are audited.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        new_status: OrderStatus,
        force_local: bool,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db;
        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.status.is_terminal() {
            return Err(ServiceError::StateConflict(format!(
                "order {} is already {}",
                order.order_number, order.status
            )));
        }
        if !transition_allowed(order.status, new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot transition order {} from {} to {}",
                order.order_number, order.status, new_status
            )));
        }

        let needs_external = order.transferred
            && matches!(new_status, OrderStatus::Cancelled | OrderStatus::Invoiced);
        let forced = needs_external && force_local;
        if needs_external && !force_local {
            let platform = self.platform.as_ref().ok_or_else(|| {
                ServiceError::SyncFailed("commerce platform not configured".to_string())
            })?;
            let external_id = order.external_id.as_deref().ok_or_else(|| {
                ServiceError::SyncFailed("transferred order has no external reference".to_string())
            })?;
            let call = match new_status {
                OrderStatus::Cancelled => platform.cancel_order(external_id).await,
                _ => platform.close_order(external_id).await,
            };
            call.map_err(|e| ServiceError::SyncFailed(e.to_string()))?;
        }

        let old_status = order.status;
        let actor = ctx.actor.clone();
        let updated = db
            .transaction::<_, order::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let version = order.version + 1;
                    let order_id = order.id;
                    let mut active: order::ActiveModel = order.into();
                    active.status = Set(new_status);
                    active.updated_at = Set(Some(now));
                    active.version = Set(version);
                    let updated = active.update(txn).await?;

                    if forced {
                        audit_log::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            order_id: Set(order_id),
                            order_item_id: Set(None),
                            source_group_id: Set(None),
                            target_group_id: Set(None),
                            action: Set("forced_local_status_change".to_string()),
                            actor: Set(actor),
                            detail: Set(Some(format!(
                                "local-only transition to {} on a transferred order",
                                new_status
                            ))),
                            created_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                    }
                    Ok(updated)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(order_id = %updated.id, %old_status, %new_status, "order status updated");
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderStatusChanged {
                    order_id: updated.id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, "failed to send status change event");
            }
        }
        Ok(updated)
    }

    /// Applies one status transition to many orders, reporting per-order
    /// outcomes instead of a single boolean.
    pub async fn update_status_many(
        &self,
        ctx: &RequestContext,
        order_ids: &[Uuid],
        new_status: OrderStatus,
        force_local: bool,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for &order_id in order_ids {
            match self
                .update_status(ctx, order_id, new_status, force_local)
                .await
            {
                Ok(_) => outcome.succeeded.push(order_id),
                Err(e) => outcome.failed.push((order_id, e.to_string())),
            }
        }
        outcome
    }

    /// Archives a terminal order.
    #[instrument(skip(self, _ctx))]
    pub async fn archive_order(
        &self,
        _ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db;
        let order = self.load(order_id).await?;
        if !order.status.is_terminal() {
            return Err(ServiceError::StateConflict(format!(
                "order {} is {}; only cancelled or invoiced orders can be archived",
                order.order_number, order.status
            )));
        }
        if order.lifecycle != OrderLifecycle::Active {
            return Err(ServiceError::StateConflict(format!(
                "order {} is already {}",
                order.order_number, order.lifecycle
            )));
        }
        let mut active: order::ActiveModel = order.into();
        active.lifecycle = Set(OrderLifecycle::Archived);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        if let Some(sender) = &self.event_sender {
            let _ = sender.send(Event::OrderArchived(updated.id)).await;
        }
        Ok(updated)
    }

    /// Moves an archived order to the trash. A transferred order must be
    /// cancelled or closed on the platform first; the stored external status
    /// is refreshed before the check when the platform is reachable.
    #[instrument(skip(self, _ctx))]
    pub async fn trash_order(
        &self,
        _ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db;
        let mut order = self.load(order_id).await?;
        if order.lifecycle != OrderLifecycle::Archived {
            return Err(ServiceError::StateConflict(format!(
                "order {} must be archived before trashing (currently {})",
                order.order_number, order.lifecycle
            )));
        }

        if order.transferred {
            if let (Some(platform), Some(external_id)) =
                (self.platform.as_ref(), order.external_id.clone())
            {
                if let Ok(state) = platform.get_order_state(&external_id).await {
                    let mut active: order::ActiveModel = order.clone().into();
                    active.external_status = Set(Some(state.status.clone()));
                    order = active.update(db).await?;
                }
            }
            let settled = order
                .external_status
                .clone()
                .map(|status| ExternalOrderState { status }.is_settled())
                .unwrap_or(false);
            if !settled {
                return Err(ServiceError::StateConflict(format!(
                    "order {} is still open on the commerce platform; cancel or close it there first",
                    order.order_number
                )));
            }
        }

        let mut active: order::ActiveModel = order.into();
        active.lifecycle = Set(OrderLifecycle::Trashed);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        if let Some(sender) = &self.event_sender {
            let _ = sender.send(Event::OrderTrashed(updated.id)).await;
        }
        Ok(updated)
    }

    /// Permanently removes a trashed order. Dependent rows are deleted
    /// explicitly (trackings, shipment items, shipments, order items,
    /// groups, audit rows) before the header; nothing relies on implicit
    /// cascade behavior.
    #[instrument(skip(self, _ctx))]
    pub async fn delete_order_permanently(
        &self,
        _ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        let order = self.load(order_id).await?;
        if order.lifecycle != OrderLifecycle::Trashed {
            return Err(ServiceError::StateConflict(format!(
                "order {} must be trashed before permanent removal",
                order.order_number
            )));
        }

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let shipments = shipment::Entity::find()
                    .filter(shipment::Column::OrderId.eq(order.id))
                    .all(txn)
                    .await?;
                let shipment_ids: Vec<Uuid> = shipments.iter().map(|s| s.id).collect();
                if !shipment_ids.is_empty() {
                    shipment_tracking::Entity::delete_many()
                        .filter(
                            shipment_tracking::Column::ShipmentId.is_in(shipment_ids.clone()),
                        )
                        .exec(txn)
                        .await?;
                    shipment_item::Entity::delete_many()
                        .filter(shipment_item::Column::ShipmentId.is_in(shipment_ids))
                        .exec(txn)
                        .await?;
                }
                shipment::Entity::delete_many()
                    .filter(shipment::Column::OrderId.eq(order.id))
                    .exec(txn)
                    .await?;
                order_item::Entity::delete_many()
                    .filter(order_item::Column::OrderId.eq(order.id))
                    .exec(txn)
                    .await?;
                planned_shipment::Entity::delete_many()
                    .filter(planned_shipment::Column::OrderId.eq(order.id))
                    .exec(txn)
                    .await?;
                audit_log::Entity::delete_many()
                    .filter(audit_log::Column::OrderId.eq(order.id))
                    .exec(txn)
                    .await?;
                OrderEntity::delete_by_id(order.id).exec(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })?;

        info!(%order_id, "order permanently removed");
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(Event::OrderDeleted(order_id)).await;
        }
        Ok(())
    }

    async fn load(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn pending_can_ship_or_cancel() {
        assert!(transition_allowed(Pending, PartiallyShipped));
        assert!(transition_allowed(Pending, Shipped));
        assert!(transition_allowed(Pending, Cancelled));
        assert!(!transition_allowed(Pending, Invoiced));
    }

    #[test]
    fn shipped_orders_can_be_invoiced() {
        assert!(transition_allowed(PartiallyShipped, Invoiced));
        assert!(transition_allowed(Shipped, Invoiced));
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for to in [Pending, PartiallyShipped, Shipped, Invoiced, Cancelled] {
            assert!(!transition_allowed(Invoiced, to));
            assert!(!transition_allowed(Cancelled, to));
        }
    }

    #[test]
    fn shipment_voiding_can_move_shipped_back_to_partial() {
        assert!(transition_allowed(Shipped, PartiallyShipped));
    }
}
