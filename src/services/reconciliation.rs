//! Inbound fulfillment reconciliation.
//!
//! Periodically pulls fulfillments the commerce platform recorded for
//! transferred orders and imports the ones the engine has not seen, so
//! warehouse activity on either side converges to the same shipment history.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    commerce::{types::ExternalFulfillment, CommercePlatform},
    config::SyncConfig,
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
        product_variant::{self, Entity as ProductVariantEntity},
        shipment::{self, Entity as ShipmentEntity},
        shipment_item, shipment_tracking,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::OrderStatus,
    services::fulfillment::{recompute_group_statuses, recompute_order_status},
};

lazy_static! {
    static ref SYNC_RUNS: IntCounter = register_int_counter!(
        "reconciliation_runs_total",
        "Total number of reconciliation passes"
    )
    .expect("metric can be created");
    static ref FULFILLMENTS_IMPORTED: IntCounter = register_int_counter!(
        "fulfillments_imported_total",
        "Total number of external fulfillments imported as local shipments"
    )
    .expect("metric can be created");
    static ref SYNC_ORDER_FAILURES: IntCounter = register_int_counter!(
        "reconciliation_order_failures_total",
        "Total number of orders that failed to reconcile"
    )
    .expect("metric can be created");
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub processed: usize,
    pub created_shipments: usize,
    /// Orders that failed, with the error text. One bad order never stops
    /// the rest of the batch.
    pub failures: Vec<(Uuid, String)>,
}

#[derive(Clone)]
pub struct ReconciliationService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
    platform: Arc<dyn CommercePlatform>,
    config: SyncConfig,
}

impl ReconciliationService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        platform: Arc<dyn CommercePlatform>,
        config: SyncConfig,
    ) -> Self {
        Self {
            db,
            event_sender,
            platform,
            config,
        }
    }

    /// Runs one reconciliation pass over recently active transferred orders.
    #[instrument(skip(self))]
    pub async fn run_sync(&self) -> Result<SyncReport, ServiceError> {
        SYNC_RUNS.inc();
        let cutoff = Utc::now() - ChronoDuration::days(self.config.recency_days);
        let candidates = OrderEntity::find()
            .filter(order::Column::Transferred.eq(true))
            .filter(
                order::Column::Status
                    .is_not_in([OrderStatus::Cancelled, OrderStatus::Invoiced]),
            )
            .filter(order::Column::UpdatedAt.gte(cutoff))
            .order_by_asc(order::Column::UpdatedAt)
            .limit(self.config.batch_limit)
            .all(&*self.db)
            .await?;

        let mut report = SyncReport::default();
        let total = candidates.len();
        for (index, candidate) in candidates.into_iter().enumerate() {
            let order_id = candidate.id;
            match self.sync_order(candidate).await {
                Ok(created) => report.created_shipments += created,
                Err(e) => {
                    SYNC_ORDER_FAILURES.inc();
                    warn!(%order_id, error = %e, "order reconciliation failed");
                    report.failures.push((order_id, e.to_string()));
                }
            }
            report.processed += 1;
            // Spread the platform calls out instead of bursting.
            if index + 1 < total && self.config.pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.pause_ms)).await;
            }
        }

        info!(
            processed = report.processed,
            created = report.created_shipments,
            failed = report.failures.len(),
            "reconciliation pass finished"
        );
        Ok(report)
    }

    /// Reconciles one order: imports unseen external fulfillments, then
    /// recomputes the order's status and refreshes its external status.
    /// Returns the number of shipments created.
    async fn sync_order(&self, order: order::Model) -> Result<usize, ServiceError> {
        let db = &*self.db;
        let external_id = order
            .external_id
            .clone()
            .ok_or_else(|| ServiceError::SyncFailed("order has no external reference".into()))?;

        let fulfillments = self
            .platform
            .list_fulfillments(&external_id)
            .await
            .map_err(|e| ServiceError::SyncFailed(format!("fulfillment listing failed: {}", e)))?;

        let known: HashSet<String> = ShipmentEntity::find()
            .filter(shipment::Column::OrderId.eq(order.id))
            .filter(shipment::Column::ExternalFulfillmentId.is_not_null())
            .all(db)
            .await?
            .into_iter()
            .filter_map(|s| s.external_fulfillment_id)
            .collect();

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(db)
            .await?;
        let variant_ids: Vec<Uuid> = items.iter().map(|i| i.variant_id).collect();
        let variants = ProductVariantEntity::find()
            .filter(product_variant::Column::Id.is_in(variant_ids))
            .all(db)
            .await?;
        let item_by_variant_external: HashMap<&str, &order_item::Model> = variants
            .iter()
            .filter_map(|v| v.external_variant_id.as_deref().map(|ext| (ext, v.id)))
            .filter_map(|(ext, variant_id)| {
                items.iter().find(|i| i.variant_id == variant_id).map(|i| (ext, i))
            })
            .collect();
        let item_by_line: HashMap<&str, &order_item::Model> = items
            .iter()
            .filter_map(|i| i.external_line_id.as_deref().map(|line| (line, i)))
            .collect();
        let item_by_sku: HashMap<&str, &order_item::Model> =
            items.iter().map(|i| (i.sku.as_str(), i)).collect();

        let mut created = 0usize;
        for fulfillment in fulfillments {
            if known.contains(&fulfillment.id) {
                continue;
            }
            let mapped = map_fulfillment_lines(
                &fulfillment,
                &item_by_line,
                &item_by_variant_external,
                &item_by_sku,
            );
            if mapped.is_empty() {
                warn!(
                    order_id = %order.id,
                    external_fulfillment_id = %fulfillment.id,
                    "external fulfillment matched no local order items; skipped"
                );
                continue;
            }

            let shipment_id = self
                .import_fulfillment(order.id, &fulfillment, &mapped)
                .await?;
            FULFILLMENTS_IMPORTED.inc();
            created += 1;

            if let Some(sender) = &self.event_sender {
                if let Err(e) = sender
                    .send(Event::FulfillmentReconciled {
                        order_id: order.id,
                        shipment_id,
                        external_fulfillment_id: fulfillment.id.clone(),
                    })
                    .await
                {
                    warn!(error = %e, "failed to send reconciliation event");
                }
            }
        }

        // Recompute after the imports above so they are all counted.
        recompute_order_status(db, order.id).await?;
        recompute_group_statuses(db, order.id).await?;
        let fresh = OrderEntity::find_by_id(order.id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order.id)))?;

        match self.platform.get_order_state(&external_id).await {
            Ok(state) => {
                if fresh.external_status.as_deref() != Some(state.status.as_str()) {
                    let mut active: order::ActiveModel = fresh.into();
                    active.external_status = Set(Some(state.status));
                    active.updated_at = Set(Some(Utc::now()));
                    active.update(db).await?;
                }
            }
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "external status refresh failed");
            }
        }

        Ok(created)
    }

    /// Persists one external fulfillment as a local shipment with its items
    /// and tracking rows, all in one transaction.
    async fn import_fulfillment(
        &self,
        order_id: Uuid,
        fulfillment: &ExternalFulfillment,
        mapped: &[(Uuid, Decimal, i32)],
    ) -> Result<Uuid, ServiceError> {
        let fulfillment = fulfillment.clone();
        let mapped = mapped.to_vec();
        self.db
            .transaction::<_, Uuid, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let subtotal: Decimal = mapped
                        .iter()
                        .map(|(_, unit_price, qty)| *unit_price * Decimal::from(*qty))
                        .sum();
                    let saved = shipment::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(order_id),
                        planned_shipment_id: Set(None),
                        subtotal: Set(subtotal),
                        shipping_cost: Set(Decimal::ZERO),
                        total: Set(subtotal),
                        shipped_at: Set(fulfillment.shipped_at.unwrap_or(now)),
                        external_fulfillment_id: Set(Some(fulfillment.id.clone())),
                        note: Set(Some("imported from commerce platform".to_string())),
                        created_by: Set("sync".to_string()),
                        voided: Set(false),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    }
                    .insert(txn)
                    .await?;

                    for (order_item_id, _, quantity) in &mapped {
                        shipment_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            shipment_id: Set(saved.id),
                            order_item_id: Set(*order_item_id),
                            quantity: Set(*quantity),
                            unit_price: Set(None),
                            created_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                    }
                    for tracking in &fulfillment.tracking {
                        shipment_tracking::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            shipment_id: Set(saved.id),
                            carrier: Set(tracking.carrier.clone()),
                            tracking_number: Set(tracking.number.clone()),
                            created_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                    }
                    Ok(saved.id)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }
}

/// Maps external fulfillment lines to `(order_item_id, unit_price, quantity)`.
/// The recorded line reference wins; the external variant id and finally the
/// SKU are fallbacks. Unmatched lines are dropped with a warning.
fn map_fulfillment_lines(
    fulfillment: &ExternalFulfillment,
    by_line: &HashMap<&str, &order_item::Model>,
    by_variant: &HashMap<&str, &order_item::Model>,
    by_sku: &HashMap<&str, &order_item::Model>,
) -> Vec<(Uuid, Decimal, i32)> {
    let mut mapped = Vec::with_capacity(fulfillment.line_items.len());
    for line in &fulfillment.line_items {
        let item = line
            .line_item_id
            .as_deref()
            .and_then(|id| by_line.get(id))
            .or_else(|| line.variant_id.as_deref().and_then(|id| by_variant.get(id)))
            .or_else(|| line.sku.as_deref().and_then(|sku| by_sku.get(sku)));
        match item {
            Some(item) => mapped.push((item.id, item.unit_price, line.quantity)),
            None => warn!(
                external_fulfillment_id = %fulfillment.id,
                line_item_id = ?line.line_item_id,
                sku = ?line.sku,
                "fulfillment line matched no local order item; dropped"
            ),
        }
    }
    mapped
}
