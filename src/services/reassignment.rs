//! Reassignment of order items between planned shipment groups.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        audit_log, delivery_window,
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
        planned_shipment::{self, Entity as PlannedShipmentEntity},
        product_variant, shipment,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{PlannedShipmentStatus, RequestContext},
    services::fulfillment::{recompute_group_statuses, recompute_order_bounds},
    ship_window::{validate_ship_window, WindowBounds},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReassignItemRequest {
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    /// Group the client believes the item is in; a mismatch means the client
    /// is stale and the move is refused.
    pub source_group_id: Uuid,
    pub target: ReassignTarget,
    /// Proceed despite a window violation. Every overridden move lands in
    /// the audit trail.
    #[serde(default)]
    pub override_window: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ReassignTarget {
    Existing {
        group_id: Uuid,
    },
    New {
        window_ref: Option<String>,
        starts_at: Option<NaiveDate>,
        ends_at: Option<NaiveDate>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReassignItemResult {
    pub item: order_item::Model,
    pub target_group: planned_shipment::Model,
    /// Present when the source group emptied out and was removed.
    pub deleted_source_group: Option<Uuid>,
    pub overridden: bool,
}

#[derive(Clone)]
pub struct ReassignmentService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl ReassignmentService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Moves one order item to another planned shipment of the same order,
    /// re-validating the target's dates against the item's catalog window
    /// and cleaning up the source group if it empties.
    #[instrument(skip(self, ctx, request), fields(order_id = %request.order_id, actor = %ctx.actor))]
    pub async fn reassign_item(
        &self,
        ctx: &RequestContext,
        request: ReassignItemRequest,
    ) -> Result<ReassignItemResult, ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(request.order_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", request.order_id))
            })?;
        if !order.is_editable() {
            return Err(ServiceError::StateConflict(format!(
                "order {} is {} and cannot be edited",
                order.order_number, order.status
            )));
        }

        let item = OrderItemEntity::find_by_id(request.order_item_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order item {} not found", request.order_item_id))
            })?;
        if item.order_id != order.id {
            return Err(ServiceError::ValidationError(format!(
                "order item {} does not belong to order {}",
                item.id, order.order_number
            )));
        }
        if item.planned_shipment_id != Some(request.source_group_id) {
            return Err(ServiceError::StateConflict(format!(
                "order item {} is no longer in planned shipment {}",
                item.id, request.source_group_id
            )));
        }

        // Target dates, resolved before any mutation.
        let (target_group_id, target_dates, target_window) = match &request.target {
            ReassignTarget::Existing { group_id } => {
                let group = PlannedShipmentEntity::find_by_id(*group_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Planned shipment {} not found", group_id))
                    })?;
                if group.order_id != order.id {
                    return Err(ServiceError::ValidationError(format!(
                        "planned shipment {} belongs to a different order",
                        group.id
                    )));
                }
                if group.id == request.source_group_id {
                    return Err(ServiceError::ValidationError(
                        "target group is the same as the source group".to_string(),
                    ));
                }
                (
                    Some(group.id),
                    (group.starts_at, group.ends_at),
                    (group.window_ref.clone(), group.window_name.clone()),
                )
            }
            ReassignTarget::New {
                window_ref,
                starts_at,
                ends_at,
            } => {
                let window_name = match window_ref {
                    Some(handle) => Some(self.window_name(db, handle).await?),
                    None => None,
                };
                (None, (*starts_at, *ends_at), (window_ref.clone(), window_name))
            }
        };

        let violation = self
            .check_item_window(db, &item, target_dates.0, target_dates.1)
            .await?;
        let overridden = match violation {
            Some(violation) if !request.override_window => {
                return Err(ServiceError::WindowViolation {
                    window: violation.window,
                    reason: violation.reason,
                });
            }
            Some(_) => true,
            None => false,
        };

        let source_group_id = request.source_group_id;
        let actor = ctx.actor.clone();
        let order_for_txn = order.clone();
        let item_for_txn = item.clone();

        let (moved_item, target_group, deleted_source) = db
            .transaction::<_, (order_item::Model, planned_shipment::Model, Option<Uuid>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let now = Utc::now();
                        let target_group = match target_group_id {
                            Some(id) => PlannedShipmentEntity::find_by_id(id)
                                .one(txn)
                                .await?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!(
                                        "Planned shipment {} not found",
                                        id
                                    ))
                                })?,
                            None => {
                                planned_shipment::ActiveModel {
                                    id: Set(Uuid::new_v4()),
                                    order_id: Set(order_for_txn.id),
                                    window_ref: Set(target_window.0.clone()),
                                    window_name: Set(target_window.1.clone()),
                                    starts_at: Set(target_dates.0),
                                    ends_at: Set(target_dates.1),
                                    status: Set(PlannedShipmentStatus::Planned),
                                    created_at: Set(now),
                                    updated_at: Set(Some(now)),
                                }
                                .insert(txn)
                                .await?
                            }
                        };

                        let mut active: order_item::ActiveModel = item_for_txn.into();
                        active.planned_shipment_id = Set(Some(target_group.id));
                        active.updated_at = Set(Some(now));
                        let moved_item = active.update(txn).await?;

                        recompute_group_statuses(txn, order_for_txn.id).await?;

                        let deleted_source =
                            delete_group_if_orphaned(txn, source_group_id).await?;
                        recompute_order_bounds(txn, &order_for_txn).await?;

                        if overridden {
                            audit_log::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                order_id: Set(order_for_txn.id),
                                order_item_id: Set(Some(moved_item.id)),
                                source_group_id: Set(Some(source_group_id)),
                                target_group_id: Set(Some(target_group.id)),
                                action: Set("reassign_window_override".to_string()),
                                actor: Set(actor),
                                detail: Set(Some(
                                    "item moved despite ship-window violation".to_string(),
                                )),
                                created_at: Set(now),
                            }
                            .insert(txn)
                            .await?;
                        }

                        Ok((moved_item, target_group, deleted_source))
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            order_item_id = %moved_item.id,
            target_group_id = %target_group.id,
            overridden,
            "order item reassigned"
        );
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderItemReassigned {
                    order_id: order.id,
                    order_item_id: moved_item.id,
                    target_group_id: target_group.id,
                    overridden,
                })
                .await
            {
                warn!(error = %e, "failed to send reassignment event");
            }
        }

        Ok(ReassignItemResult {
            item: moved_item,
            target_group,
            deleted_source_group: deleted_source,
            overridden,
        })
    }

    async fn window_name<C: ConnectionTrait>(
        &self,
        conn: &C,
        handle: &str,
    ) -> Result<String, ServiceError> {
        let window = delivery_window::Entity::find()
            .filter(delivery_window::Column::Handle.eq(handle))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("unknown delivery window \"{}\"", handle))
            })?;
        Ok(window.name)
    }

    /// Checks the target dates against the moving item's catalog window.
    /// Returns the violation instead of failing so the caller can apply the
    /// override policy.
    async fn check_item_window<C: ConnectionTrait>(
        &self,
        conn: &C,
        item: &order_item::Model,
        target_start: Option<NaiveDate>,
        target_end: Option<NaiveDate>,
    ) -> Result<Option<crate::ship_window::WindowViolation>, ServiceError> {
        let variant = product_variant::Entity::find_by_id(item.variant_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("catalog variant for SKU {} not found", item.sku))
            })?;
        let handle = match &variant.window_ref {
            Some(handle) => handle.clone(),
            // No catalog window on the item: any target group is acceptable.
            None => return Ok(None),
        };
        let window = delivery_window::Entity::find()
            .filter(delivery_window::Column::Handle.eq(handle.clone()))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("unknown delivery window \"{}\"", handle))
            })?;

        let (start, end) = match (target_start, target_end) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Ok(Some(crate::ship_window::WindowViolation {
                    window: window.name,
                    reason: "target group has no ship dates to validate against the item's window"
                        .to_string(),
                }))
            }
        };
        let bounds = WindowBounds {
            name: window.name,
            starts_at: window.starts_at,
            ends_at: window.ends_at,
        };
        Ok(validate_ship_window(start, end, &[bounds]).err())
    }
}

/// Deletes a planned shipment that has no member items and no physical
/// shipments pointing at it. Returns the deleted id, if any.
async fn delete_group_if_orphaned<C: ConnectionTrait>(
    conn: &C,
    group_id: Uuid,
) -> Result<Option<Uuid>, ServiceError> {
    let member_count = OrderItemEntity::find()
        .filter(order_item::Column::PlannedShipmentId.eq(group_id))
        .count(conn)
        .await?;
    if member_count > 0 {
        return Ok(None);
    }
    let shipment_count = shipment::Entity::find()
        .filter(shipment::Column::PlannedShipmentId.eq(group_id))
        .count(conn)
        .await?;
    if shipment_count > 0 {
        return Ok(None);
    }
    if let Some(group) = PlannedShipmentEntity::find_by_id(group_id).one(conn).await? {
        group.delete(conn).await?;
        return Ok(Some(group_id));
    }
    Ok(None)
}
