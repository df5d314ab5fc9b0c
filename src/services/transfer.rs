//! Outbound transfer of local orders to the commerce platform.

use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    commerce::{
        types::{ExternalCustomerPayload, ExternalLinePayload, ExternalOrderPayload},
        CommerceError, CommercePlatform,
    },
    db::DbPool,
    entities::{
        customer::{self, Entity as CustomerEntity},
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
        planned_shipment::{self, Entity as PlannedShipmentEntity},
        product_variant::{self, Entity as ProductVariantEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::RequestContext,
    services::BatchOutcome,
};

lazy_static! {
    static ref ORDER_TRANSFERS: IntCounter = register_int_counter!(
        "order_transfers_total",
        "Total number of orders transferred to the commerce platform"
    )
    .expect("metric can be created");
    static ref ORDER_TRANSFER_FAILURES: IntCounter = register_int_counter!(
        "order_transfer_failures_total",
        "Total number of failed order transfers"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResult {
    pub order: order::Model,
    pub external_id: String,
    /// Items for which the platform returned no line reference; they fall
    /// back to variant matching during reconciliation.
    pub unreferenced_items: Vec<Uuid>,
}

#[derive(Clone)]
pub struct TransferService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
    platform: Arc<dyn CommercePlatform>,
}

impl TransferService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        platform: Arc<dyn CommercePlatform>,
    ) -> Self {
        Self {
            db,
            event_sender,
            platform,
        }
    }

    /// Pushes one order to the commerce platform.
    ///
    /// The transfer is all-or-nothing from the platform's point of view:
    /// every line must resolve to an external variant before any call is
    /// made, and an order already transferred is refused outright. On
    /// success the order is marked transferred and each item records the
    /// line reference the platform handed back.
    #[instrument(skip(self, _ctx), fields(order_id = %order_id))]
    pub async fn transfer_order(
        &self,
        _ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<TransferResult, ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.transferred {
            ORDER_TRANSFER_FAILURES.inc();
            return Err(ServiceError::AlreadyTransferred(order.id));
        }
        if order.status.is_terminal() {
            ORDER_TRANSFER_FAILURES.inc();
            return Err(ServiceError::StateConflict(format!(
                "order {} is {} and cannot be transferred",
                order.order_number, order.status
            )));
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(db)
            .await?;
        let customer = CustomerEntity::find_by_id(order.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", order.customer_id))
            })?;
        let groups = PlannedShipmentEntity::find()
            .filter(planned_shipment::Column::OrderId.eq(order.id))
            .all(db)
            .await?;

        // Resolve every line to an external variant before touching the
        // platform; the caller gets the complete list of gaps in one pass.
        let mut lines = Vec::with_capacity(items.len());
        let mut unresolved = Vec::new();
        for item in &items {
            if item.effective_quantity() <= 0 {
                continue;
            }
            let variant = ProductVariantEntity::find_by_id(item.variant_id)
                .one(db)
                .await?;
            match variant.and_then(|v| v.external_variant_id) {
                Some(external_variant_id) => lines.push(ExternalLinePayload {
                    reference: item.id,
                    variant_id: external_variant_id,
                    quantity: item.effective_quantity(),
                    price: item.unit_price,
                }),
                None => unresolved.push(item.sku.clone()),
            }
        }
        if !unresolved.is_empty() {
            ORDER_TRANSFER_FAILURES.inc();
            return Err(ServiceError::UnresolvedSkus(unresolved));
        }
        if lines.is_empty() {
            ORDER_TRANSFER_FAILURES.inc();
            return Err(ServiceError::ValidationError(format!(
                "order {} has no shippable lines to transfer",
                order.order_number
            )));
        }

        let mut tags = vec![order.order_type.to_string()];
        for group in &groups {
            if let Some(name) = &group.window_name {
                if !tags.contains(name) {
                    tags.push(name.clone());
                }
            }
        }

        let customer_payload = ExternalCustomerPayload {
            email: customer.email.clone(),
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            shipping_address: customer.shipping_address.clone(),
            billing_address: customer.billing_address.clone(),
        };
        let mut payload = ExternalOrderPayload {
            order_number: order.order_number.clone(),
            customer_id: customer.external_id.clone(),
            customer: customer_payload.clone(),
            currency: order.currency.clone(),
            shipping_address: order.shipping_address.clone(),
            billing_address: order.billing_address.clone(),
            tags,
            note: order.notes.clone(),
            line_items: lines,
        };

        let external = match self.platform.create_order(&payload).await {
            Ok(external) => external,
            // A stale customer reference gets one repair attempt: create the
            // customer, persist the fresh mapping, retry the order once.
            Err(CommerceError::NotFound) if payload.customer_id.is_some() => {
                warn!(
                    customer_id = %customer.id,
                    "external customer reference rejected; recreating and retrying"
                );
                let created = self
                    .platform
                    .create_customer(&customer_payload)
                    .await
                    .map_err(|e| {
                        ORDER_TRANSFER_FAILURES.inc();
                        ServiceError::SyncFailed(format!("customer creation failed: {}", e))
                    })?;
                let mut active: customer::ActiveModel = customer.clone().into();
                active.external_id = Set(Some(created.id.clone()));
                active.updated_at = Set(Some(Utc::now()));
                active.update(db).await?;

                payload.customer_id = Some(created.id);
                self.platform.create_order(&payload).await.map_err(|e| {
                    ORDER_TRANSFER_FAILURES.inc();
                    ServiceError::SyncFailed(format!("order transfer failed after retry: {}", e))
                })?
            }
            Err(e) => {
                ORDER_TRANSFER_FAILURES.inc();
                return Err(ServiceError::SyncFailed(format!(
                    "order transfer failed: {}",
                    e
                )));
            }
        };

        let external_id = external.id.clone();
        let external_lines = external.line_items;
        let order_for_txn = order.clone();
        let items_for_txn = items;
        let (updated, unreferenced_items) = db
            .transaction::<_, (order::Model, Vec<Uuid>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let mut unreferenced = Vec::new();
                    for item in items_for_txn {
                        let line_ref = external_lines
                            .iter()
                            .find(|l| l.reference == Some(item.id))
                            .map(|l| l.id.clone());
                        if line_ref.is_none() {
                            unreferenced.push(item.id);
                        }
                        let mut active: order_item::ActiveModel = item.into();
                        active.external_line_id = Set(line_ref);
                        active.updated_at = Set(Some(now));
                        active.update(txn).await?;
                    }

                    let version = order_for_txn.version + 1;
                    let mut active: order::ActiveModel = order_for_txn.into();
                    active.transferred = Set(true);
                    active.external_id = Set(Some(external_id.clone()));
                    active.updated_at = Set(Some(now));
                    active.version = Set(version);
                    let updated = active.update(txn).await?;
                    Ok((updated, unreferenced))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        ORDER_TRANSFERS.inc();
        info!(
            order_number = %updated.order_number,
            external_id = %external.id,
            "order transferred"
        );
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderTransferred {
                    order_id: updated.id,
                    external_id: external.id.clone(),
                })
                .await
            {
                warn!(error = %e, "failed to send transfer event");
            }
        }

        Ok(TransferResult {
            order: updated,
            external_id: external.id,
            unreferenced_items,
        })
    }

    /// Transfers a batch of orders, isolating failures per order.
    pub async fn transfer_many(&self, ctx: &RequestContext, order_ids: &[Uuid]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for &order_id in order_ids {
            match self.transfer_order(ctx, order_id).await {
                Ok(_) => outcome.succeeded.push(order_id),
                Err(e) => {
                    warn!(%order_id, error = %e, "order transfer failed");
                    outcome.failed.push((order_id, e.to_string()));
                }
            }
        }
        outcome
    }
}
