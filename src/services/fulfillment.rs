//! Fulfillment recording.
//!
//! Records physical shipments against an order and owns the authoritative
//! status recomputation: aggregate shipped quantities are always re-read
//! from scratch, never patched incrementally.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commerce::{
        types::{ExternalFulfillmentLine, ExternalFulfillmentPayload, ExternalTracking},
        CommercePlatform,
    },
    db::DbPool,
    entities::{
        order, order_item, planned_shipment,
        shipment::{self, Entity as ShipmentEntity},
        shipment_item::{self, Entity as ShipmentItemEntity},
        shipment_tracking,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderStatus, PlannedShipmentStatus, RequestContext},
};

lazy_static! {
    static ref SHIPMENTS_RECORDED: IntCounter = register_int_counter!(
        "shipments_recorded_total",
        "Total number of shipments recorded"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordShipmentRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "At least one shipment line is required"))]
    pub items: Vec<ShipmentLine>,
    pub shipping_cost: Decimal,
    pub shipped_at: Option<DateTime<Utc>>,
    pub tracking: Vec<TrackingInput>,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ShipmentLine {
    pub order_item_id: Uuid,
    #[validate(range(min = 1, message = "Shipped quantity must be positive"))]
    pub quantity: i32,
    /// Price override for this line; the order item price applies otherwise.
    pub unit_price: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingInput {
    pub carrier: Option<String>,
    pub number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordShipmentResult {
    pub shipment: shipment::Model,
    pub order_status: OrderStatus,
    /// Failures of post-commit follow-ups (external mirroring). The local
    /// shipment is committed regardless.
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateShipmentRequest {
    pub shipping_cost: Option<Decimal>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct FulfillmentService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
    platform: Option<Arc<dyn CommercePlatform>>,
}

impl FulfillmentService {
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

    /// Records a physical shipment and recomputes the order's fulfillment
    /// state. If the order was previously transferred, the shipment is
    /// mirrored to the platform after commit; a mirror failure becomes a
    /// warning on the successful result.
    #[instrument(skip(self, ctx, request), fields(order_id = %request.order_id, actor = %ctx.actor))]
    pub async fn record_shipment(
        &self,
        ctx: &RequestContext,
        request: RecordShipmentRequest,
    ) -> Result<RecordShipmentResult, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for line in &request.items {
            line.validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        }

        let db = &*self.db;
        let order_id = request.order_id;
        let lines = request.items.clone();
        let tracking = request.tracking.clone();
        let note = request.note.clone();
        let shipping_cost = request.shipping_cost;
        let shipped_at_override = request.shipped_at;
        let actor = ctx.actor.clone();

        // Guard reads and writes share one transaction; a concurrent
        // recording or cancellation is either fully visible here or queued
        // behind this commit.
        let (order, order_items, saved_shipment, new_status) = db
            .transaction::<_, (order::Model, Vec<order_item::Model>, shipment::Model, OrderStatus), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let order = order::Entity::find_by_id(order_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Order {} not found", order_id))
                            })?;
                        if order.status.is_terminal() {
                            return Err(ServiceError::StateConflict(format!(
                                "order {} is {} and cannot receive shipments",
                                order.order_number, order.status
                            )));
                        }

                        let order_items = order_item::Entity::find()
                            .filter(order_item::Column::OrderId.eq(order.id))
                            .all(txn)
                            .await?;
                        let items_by_id: HashMap<Uuid, &order_item::Model> =
                            order_items.iter().map(|i| (i.id, i)).collect();

                        let already_shipped = shipped_quantities(txn, order.id).await?;
                        for line in &lines {
                            let item = items_by_id.get(&line.order_item_id).ok_or_else(|| {
                                ServiceError::ValidationError(format!(
                                    "order item {} does not belong to order {}",
                                    line.order_item_id, order.order_number
                                ))
                            })?;
                            let shipped = already_shipped.get(&item.id).copied().unwrap_or(0);
                            let remaining = i64::from(item.effective_quantity()) - shipped;
                            if i64::from(line.quantity) > remaining {
                                return Err(ServiceError::ValidationError(format!(
                                    "cannot ship {} of {}: only {} remaining",
                                    line.quantity, item.sku, remaining
                                )));
                            }
                        }

                        let subtotal: Decimal = lines
                            .iter()
                            .map(|line| {
                                let item = items_by_id[&line.order_item_id];
                                line.unit_price.unwrap_or(item.unit_price)
                                    * Decimal::from(line.quantity)
                            })
                            .sum();
                        let total = subtotal + shipping_cost;

                        // Link the shipment to a group only when all lines share one.
                        let mut group_ids: Vec<Option<Uuid>> = lines
                            .iter()
                            .map(|line| items_by_id[&line.order_item_id].planned_shipment_id)
                            .collect();
                        group_ids.dedup();
                        let planned_shipment_id = match group_ids.as_slice() {
                            [only] => *only,
                            _ => None,
                        };

                        let now = Utc::now();
                        let saved_shipment = shipment::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            order_id: Set(order.id),
                            planned_shipment_id: Set(planned_shipment_id),
                            subtotal: Set(subtotal),
                            shipping_cost: Set(shipping_cost),
                            total: Set(total),
                            shipped_at: Set(shipped_at_override.unwrap_or(now)),
                            external_fulfillment_id: Set(None),
                            note: Set(note),
                            created_by: Set(actor),
                            voided: Set(false),
                            created_at: Set(now),
                            updated_at: Set(Some(now)),
                        }
                        .insert(txn)
                        .await?;

                        for line in &lines {
                            shipment_item::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                shipment_id: Set(saved_shipment.id),
                                order_item_id: Set(line.order_item_id),
                                quantity: Set(line.quantity),
                                unit_price: Set(line.unit_price),
                                created_at: Set(now),
                            }
                            .insert(txn)
                            .await?;
                        }

                        for entry in &tracking {
                            shipment_tracking::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                shipment_id: Set(saved_shipment.id),
                                carrier: Set(entry.carrier.clone()),
                                tracking_number: Set(entry.number.clone()),
                                created_at: Set(now),
                            }
                            .insert(txn)
                            .await?;
                        }

                        let new_status = recompute_order_status(txn, order.id).await?;
                        recompute_group_statuses(txn, order.id).await?;

                        Ok((order, order_items, saved_shipment, new_status))
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        SHIPMENTS_RECORDED.inc();
        info!(
            shipment_id = %saved_shipment.id,
            order_id = %order.id,
            status = %new_status,
            "shipment recorded"
        );

        let mut warnings = Vec::new();
        let saved_shipment = if order.transferred {
            match self
                .mirror_fulfillment(&order, &saved_shipment, &request.items, &order_items)
                .await
            {
                Ok(shipment) => shipment,
                Err(e) => {
                    warn!(shipment_id = %saved_shipment.id, error = %e, "external fulfillment mirror failed");
                    warnings.push(format!("external fulfillment mirror failed: {}", e));
                    saved_shipment
                }
            }
        } else {
            saved_shipment
        };

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::ShipmentRecorded {
                    order_id: order.id,
                    shipment_id: saved_shipment.id,
                })
                .await
            {
                warn!(error = %e, "failed to send shipment recorded event");
            }
        }

        Ok(RecordShipmentResult {
            shipment: saved_shipment,
            order_status: new_status,
            warnings,
        })
    }

    /// Pushes the committed shipment to the platform and records the
    /// returned fulfillment reference so inbound sync will not re-import it.
    async fn mirror_fulfillment(
        &self,
        order: &order::Model,
        saved: &shipment::Model,
        lines: &[ShipmentLine],
        order_items: &[order_item::Model],
    ) -> Result<shipment::Model, ServiceError> {
        let platform = self
            .platform
            .as_ref()
            .ok_or_else(|| ServiceError::SyncFailed("commerce platform not configured".into()))?;
        let external_id = order
            .external_id
            .as_deref()
            .ok_or_else(|| ServiceError::SyncFailed("order has no external reference".into()))?;

        let items_by_id: HashMap<Uuid, &order_item::Model> =
            order_items.iter().map(|i| (i.id, i)).collect();
        let trackings = shipment_tracking::Entity::find()
            .filter(shipment_tracking::Column::ShipmentId.eq(saved.id))
            .all(&*self.db)
            .await?;

        let payload = ExternalFulfillmentPayload {
            shipped_at: saved.shipped_at,
            tracking: trackings
                .iter()
                .map(|t| ExternalTracking {
                    carrier: t.carrier.clone(),
                    number: t.tracking_number.clone(),
                })
                .collect(),
            line_items: lines
                .iter()
                .map(|line| {
                    let item = items_by_id[&line.order_item_id];
                    ExternalFulfillmentLine {
                        line_item_id: item.external_line_id.clone(),
                        variant_id: None,
                        sku: Some(item.sku.clone()),
                        quantity: line.quantity,
                    }
                })
                .collect(),
        };

        let fulfillment_id = platform
            .create_fulfillment(external_id, &payload)
            .await
            .map_err(|e| ServiceError::SyncFailed(e.to_string()))?;

        let mut active: shipment::ActiveModel = saved.clone().into();
        active.external_fulfillment_id = Set(Some(fulfillment_id));
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db).await?)
    }

    /// Marks a shipment voided and recomputes aggregates without it.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub async fn void_shipment(
        &self,
        ctx: &RequestContext,
        shipment_id: Uuid,
    ) -> Result<OrderStatus, ServiceError> {
        let db = &*self.db;
        let (order_id, new_status) = db
            .transaction::<_, (Uuid, OrderStatus), ServiceError>(move |txn| {
                Box::pin(async move {
                    let shipment = ShipmentEntity::find_by_id(shipment_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
                        })?;
                    if shipment.voided {
                        return Err(ServiceError::StateConflict(format!(
                            "shipment {} is already voided",
                            shipment_id
                        )));
                    }
                    let order = order::Entity::find_by_id(shipment.order_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Order {} not found", shipment.order_id))
                        })?;
                    if order.status.is_terminal() {
                        return Err(ServiceError::StateConflict(format!(
                            "order {} is {}; its shipments are frozen",
                            order.order_number, order.status
                        )));
                    }

                    let mut active: shipment::ActiveModel = shipment.into();
                    active.voided = Set(true);
                    active.updated_at = Set(Some(Utc::now()));
                    active.update(txn).await?;

                    let new_status = recompute_order_status(txn, order.id).await?;
                    recompute_group_statuses(txn, order.id).await?;
                    Ok((order.id, new_status))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::ShipmentVoided {
                    order_id,
                    shipment_id,
                })
                .await
            {
                warn!(error = %e, "failed to send shipment voided event");
            }
        }
        Ok(new_status)
    }

    /// Applies cost/date/note corrections. Quantities are immutable; a wrong
    /// shipment is voided and re-recorded instead.
    #[instrument(skip(self, ctx, request), fields(actor = %ctx.actor))]
    pub async fn update_shipment(
        &self,
        ctx: &RequestContext,
        shipment_id: Uuid,
        request: UpdateShipmentRequest,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db;
        let shipment = ShipmentEntity::find_by_id(shipment_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;
        if shipment.voided {
            return Err(ServiceError::StateConflict(format!(
                "shipment {} is voided",
                shipment_id
            )));
        }

        let subtotal = shipment.subtotal;
        let mut active: shipment::ActiveModel = shipment.into();
        if let Some(cost) = request.shipping_cost {
            active.shipping_cost = Set(cost);
            active.total = Set(subtotal + cost);
        }
        if let Some(shipped_at) = request.shipped_at {
            active.shipped_at = Set(shipped_at);
        }
        if let Some(note) = request.note {
            active.note = Set(Some(note));
        }
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(db).await?)
    }
}

/// Sums shipped quantity per order item across all non-voided shipments.
pub(crate) async fn shipped_quantities<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<HashMap<Uuid, i64>, ServiceError> {
    let shipments = ShipmentEntity::find()
        .filter(shipment::Column::OrderId.eq(order_id))
        .filter(shipment::Column::Voided.eq(false))
        .all(conn)
        .await?;
    if shipments.is_empty() {
        return Ok(HashMap::new());
    }
    let shipment_ids: Vec<Uuid> = shipments.iter().map(|s| s.id).collect();
    let items = ShipmentItemEntity::find()
        .filter(shipment_item::Column::ShipmentId.is_in(shipment_ids))
        .all(conn)
        .await?;

    let mut totals: HashMap<Uuid, i64> = HashMap::new();
    for item in items {
        *totals.entry(item.order_item_id).or_insert(0) += i64::from(item.quantity);
    }
    Ok(totals)
}

/// Recomputes the order's fulfillment status from a fresh header and
/// aggregate read and persists it when changed. Terminal orders are never
/// transitioned.
pub(crate) async fn recompute_order_status<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<OrderStatus, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
    if order.status.is_terminal() {
        return Ok(order.status);
    }

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(conn)
        .await?;
    let shipped = shipped_quantities(conn, order.id).await?;
    let any_shipped = !shipped.is_empty();

    let fully_covered = !items.is_empty()
        && items.iter().all(|item| {
            let shipped_qty = shipped.get(&item.id).copied().unwrap_or(0);
            shipped_qty >= i64::from(item.effective_quantity())
        });

    let new_status = if any_shipped && fully_covered {
        OrderStatus::Shipped
    } else if any_shipped {
        OrderStatus::PartiallyShipped
    } else {
        OrderStatus::Pending
    };

    if new_status != order.status {
        let mut active: order::ActiveModel = order.clone().into();
        active.status = Set(new_status);
        active.updated_at = Set(Some(Utc::now()));
        active.version = Set(order.version + 1);
        active.update(conn).await?;
    }
    Ok(new_status)
}

/// Refreshes every planned shipment's fulfillment status for an order.
pub(crate) async fn recompute_group_statuses<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    let groups = planned_shipment::Entity::find()
        .filter(planned_shipment::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    if groups.is_empty() {
        return Ok(());
    }
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let shipped = shipped_quantities(conn, order_id).await?;

    for group in groups {
        let members: Vec<&order_item::Model> = items
            .iter()
            .filter(|i| i.planned_shipment_id == Some(group.id))
            .collect();
        if members.is_empty() {
            continue;
        }
        let any = members
            .iter()
            .any(|i| shipped.get(&i.id).copied().unwrap_or(0) > 0);
        let all = members
            .iter()
            .all(|i| shipped.get(&i.id).copied().unwrap_or(0) >= i64::from(i.effective_quantity()));
        let new_status = if all {
            PlannedShipmentStatus::Fulfilled
        } else if any {
            PlannedShipmentStatus::PartiallyFulfilled
        } else {
            PlannedShipmentStatus::Planned
        };
        if new_status != group.status {
            let mut active: planned_shipment::ActiveModel = group.into();
            active.status = Set(new_status);
            active.updated_at = Set(Some(Utc::now()));
            active.update(conn).await?;
        }
    }
    Ok(())
}

/// Recomputes the order's cached window bounds from its surviving groups.
pub(crate) async fn recompute_order_bounds<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
) -> Result<(), ServiceError> {
    let groups = planned_shipment::Entity::find()
        .filter(planned_shipment::Column::OrderId.eq(order.id))
        .all(conn)
        .await?;
    let window_start = groups.iter().filter_map(|g| g.starts_at).min();
    let window_end = groups.iter().filter_map(|g| g.ends_at).max();

    if window_start != order.window_start || window_end != order.window_end {
        let mut active: order::ActiveModel = order.clone().into();
        active.window_start = Set(window_start);
        active.window_end = Set(window_end);
        active.updated_at = Set(Some(Utc::now()));
        active.update(conn).await?;
    }
    Ok(())
}
