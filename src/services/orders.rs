//! Order decomposition engine.
//!
//! Splits a buyer cart into one order plus planned shipment groups keyed by
//! delivery-window identity and order type, validates group dates against
//! their windows, and persists the whole result in one transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        delivery_window::{self, Entity as DeliveryWindowEntity},
        order, order_item, planned_shipment,
        product_variant::{self, Entity as ProductVariantEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{OrderLifecycle, OrderStatus, OrderType, PlannedShipmentStatus},
    order_number::OrderNumberAllocator,
    services::customers::{self, CustomerDetails},
    ship_window::{validate_ship_window, WindowBounds},
};

lazy_static! {
    static ref ORDER_CREATIONS: IntCounter =
        register_int_counter!("order_creations_total", "Total number of orders created")
            .expect("metric can be created");
    static ref ORDER_CREATION_FAILURES: IntCounter = register_int_counter!(
        "order_creation_failures_total",
        "Total number of failed order creations"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate]
    pub customer: CustomerDetails,
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CreateOrderItem>,
    /// Explicit grouping plan. When absent, groups are derived from each
    /// item's delivery-window reference.
    pub plan: Option<Vec<PlannedGroupSpec>>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderItem {
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    /// Negotiated price; falls back to the catalog price when absent.
    pub unit_price: Option<Decimal>,
    /// Delivery-window override; falls back to the variant's catalog window.
    pub window_ref: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlannedGroupSpec {
    pub window_ref: Option<String>,
    pub starts_at: Option<NaiveDate>,
    pub ends_at: Option<NaiveDate>,
    pub item_skus: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderResult {
    pub order: order::Model,
    pub planned_shipments: Vec<planned_shipment::Model>,
    pub items: Vec<order_item::Model>,
}

/// A group resolved and validated, ready to persist.
#[derive(Clone, Debug)]
struct PreparedGroup {
    window_ref: Option<String>,
    window_name: Option<String>,
    starts_at: Option<NaiveDate>,
    ends_at: Option<NaiveDate>,
}

#[derive(Clone, Debug)]
struct PreparedItem {
    variant_id: Uuid,
    sku: String,
    name: String,
    quantity: i32,
    unit_price: Decimal,
    group_index: usize,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
    allocator: OrderNumberAllocator,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        let allocator = OrderNumberAllocator::for_backend(db.get_database_backend());
        Self {
            db,
            event_sender,
            allocator,
        }
    }

    /// Decomposes a cart into one order plus its planned shipments and
    /// persists everything atomically. Post-commit notification dispatch is
    /// best-effort and never rolls the order back.
    #[instrument(skip(self, request), fields(customer_email = %request.customer.email))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResult, ServiceError> {
        request.validate().map_err(|e| {
            ORDER_CREATION_FAILURES.inc();
            ServiceError::ValidationError(e.to_string())
        })?;

        let result = self.decompose_and_persist(&request).await.map_err(|e| {
            ORDER_CREATION_FAILURES.inc();
            e
        })?;

        ORDER_CREATIONS.inc();
        info!(
            order_id = %result.order.id,
            order_number = %result.order.order_number,
            groups = result.planned_shipments.len(),
            items = result.items.len(),
            "order created"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::OrderCreated(result.order.id)).await {
                warn!(order_id = %result.order.id, error = %e, "failed to send order created event");
            }
        }

        Ok(result)
    }

    async fn decompose_and_persist(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResult, ServiceError> {
        let db = &*self.db;

        let variants = self.resolve_variants(db, &request.items).await?;
        let (groups, items) = self.build_groups(db, request, &variants).await?;

        // Order type derivation: a cart containing any pre-order line is a
        // pre-order (its number carries the pre-order prefix).
        let order_type = if items.iter().any(|i| {
            variants
                .get(&i.sku)
                .map(|v| v.order_type == OrderType::PreOrder)
                .unwrap_or(false)
        }) {
            OrderType::PreOrder
        } else {
            OrderType::Stock
        };

        let total_amount: Decimal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();

        let window_start = groups.iter().filter_map(|g| g.starts_at).min();
        let window_end = groups.iter().filter_map(|g| g.ends_at).max();

        let allocator = self.allocator.clone();
        let customer_details = request.customer.clone();
        let currency = request.currency.clone();
        let notes = request.notes.clone();

        db.transaction::<_, CreateOrderResult, ServiceError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let order_number = allocator.allocate(txn, order_type).await?;
                let customer = customers::upsert_customer(txn, &customer_details).await?;

                let order_id = Uuid::new_v4();
                let saved_order = order::ActiveModel {
                    id: Set(order_id),
                    order_number: Set(order_number),
                    order_type: Set(order_type),
                    customer_id: Set(customer.id),
                    status: Set(OrderStatus::Pending),
                    lifecycle: Set(OrderLifecycle::Active),
                    total_amount: Set(total_amount),
                    currency: Set(currency),
                    shipping_address: Set(customer_details.shipping_address.clone()),
                    billing_address: Set(customer_details.billing_address.clone()),
                    window_start: Set(window_start),
                    window_end: Set(window_end),
                    transferred: Set(false),
                    external_id: Set(None),
                    external_status: Set(None),
                    notes: Set(notes),
                    created_at: Set(now),
                    updated_at: Set(Some(now)),
                    version: Set(1),
                }
                .insert(txn)
                .await?;

                let mut saved_groups = Vec::with_capacity(groups.len());
                for group in &groups {
                    let saved = planned_shipment::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(order_id),
                        window_ref: Set(group.window_ref.clone()),
                        window_name: Set(group.window_name.clone()),
                        starts_at: Set(group.starts_at),
                        ends_at: Set(group.ends_at),
                        status: Set(PlannedShipmentStatus::Planned),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    }
                    .insert(txn)
                    .await?;
                    saved_groups.push(saved);
                }

                let mut saved_items = Vec::with_capacity(items.len());
                for item in &items {
                    let saved = order_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(order_id),
                        variant_id: Set(item.variant_id),
                        sku: Set(item.sku.clone()),
                        name: Set(item.name.clone()),
                        quantity: Set(item.quantity),
                        cancelled_quantity: Set(0),
                        unit_price: Set(item.unit_price),
                        planned_shipment_id: Set(Some(saved_groups[item.group_index].id)),
                        external_line_id: Set(None),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    }
                    .insert(txn)
                    .await?;
                    saved_items.push(saved);
                }

                Ok(CreateOrderResult {
                    order: saved_order,
                    planned_shipments: saved_groups,
                    items: saved_items,
                })
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => {
                error!(error = %db_err, "order creation transaction failed");
                ServiceError::DatabaseError(db_err)
            }
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    /// Loads the catalog rows for every SKU in the cart. The catalog is the
    /// authoritative source for order type; unknown SKUs fail the whole
    /// operation with the complete list.
    async fn resolve_variants<C: ConnectionTrait>(
        &self,
        conn: &C,
        items: &[CreateOrderItem],
    ) -> Result<BTreeMap<String, product_variant::Model>, ServiceError> {
        let skus: Vec<String> = items.iter().map(|i| i.sku.clone()).collect();
        let found = ProductVariantEntity::find()
            .filter(product_variant::Column::Sku.is_in(skus.clone()))
            .all(conn)
            .await?;

        let by_sku: BTreeMap<String, product_variant::Model> =
            found.into_iter().map(|v| (v.sku.clone(), v)).collect();

        let missing: Vec<String> = skus
            .iter()
            .filter(|sku| !by_sku.contains_key(*sku))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "unknown SKUs: {}",
                missing.join(", ")
            )));
        }
        Ok(by_sku)
    }

    /// Groups items either by the caller's explicit plan or by
    /// `(order type, delivery-window reference)`, then resolves and
    /// validates each group's dates. Any failure aborts the whole order.
    async fn build_groups<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: &CreateOrderRequest,
        variants: &BTreeMap<String, product_variant::Model>,
    ) -> Result<(Vec<PreparedGroup>, Vec<PreparedItem>), ServiceError> {
        let mut groups: Vec<PreparedGroup> = Vec::new();
        let mut items: Vec<PreparedItem> = Vec::new();

        if let Some(plan) = &request.plan {
            let mut sku_to_group: BTreeMap<&str, usize> = BTreeMap::new();
            for (index, spec) in plan.iter().enumerate() {
                // A group only exists through its members; an empty one would
                // be persisted with no items attached.
                if spec.item_skus.is_empty() {
                    return Err(ServiceError::ValidationError(format!(
                        "planned shipment {} in the plan has no items assigned",
                        index + 1
                    )));
                }
                for sku in &spec.item_skus {
                    if sku_to_group.insert(sku.as_str(), index).is_some() {
                        return Err(ServiceError::ValidationError(format!(
                            "SKU {} appears in more than one planned shipment",
                            sku
                        )));
                    }
                }
                groups.push(
                    self.resolve_group(conn, spec.window_ref.as_deref(), spec.starts_at, spec.ends_at)
                        .await?,
                );
            }
            for item in &request.items {
                let group_index = *sku_to_group.get(item.sku.as_str()).ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "SKU {} is not assigned to any planned shipment in the plan",
                        item.sku
                    ))
                })?;
                items.push(prepared_item(item, &variants[&item.sku], group_index));
            }
        } else {
            // Derived grouping: one group per (type, window ref), plus a
            // default group per type for unreferenced items.
            let mut key_to_index: BTreeMap<(OrderType, Option<String>), usize> = BTreeMap::new();
            for item in &request.items {
                let variant = &variants[&item.sku];
                let window_ref = item.window_ref.clone().or_else(|| variant.window_ref.clone());
                let key = (variant.order_type, window_ref.clone());
                let group_index = match key_to_index.get(&key) {
                    Some(index) => *index,
                    None => {
                        let group = self
                            .resolve_group(conn, window_ref.as_deref(), None, None)
                            .await?;
                        groups.push(group);
                        let index = groups.len() - 1;
                        key_to_index.insert(key, index);
                        index
                    }
                };
                items.push(prepared_item(item, variant, group_index));
            }
        }

        Ok((groups, items))
    }

    /// Resolves a group's delivery window and validates its dates. Groups
    /// without a window reference skip validation entirely (default group);
    /// a referenced window without usable dates is a hard failure.
    async fn resolve_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        window_ref: Option<&str>,
        starts_at: Option<NaiveDate>,
        ends_at: Option<NaiveDate>,
    ) -> Result<PreparedGroup, ServiceError> {
        let handle = match window_ref {
            Some(handle) => handle,
            None => {
                return Ok(PreparedGroup {
                    window_ref: None,
                    window_name: None,
                    starts_at,
                    ends_at,
                })
            }
        };

        let window = DeliveryWindowEntity::find()
            .filter(delivery_window::Column::Handle.eq(handle))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("unknown delivery window \"{}\"", handle))
            })?;

        let candidate_start = starts_at.or(window.starts_at);
        let candidate_end = ends_at.or(window.ends_at);
        let bounds = WindowBounds {
            name: window.name.clone(),
            starts_at: window.starts_at,
            ends_at: window.ends_at,
        };

        let (start, end) = match (candidate_start, candidate_end) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(ServiceError::WindowViolation {
                    window: window.name,
                    reason: "window has no configured start/end dates".to_string(),
                })
            }
        };

        validate_ship_window(start, end, &[bounds]).map_err(|v| {
            ServiceError::WindowViolation {
                window: v.window,
                reason: v.reason,
            }
        })?;

        Ok(PreparedGroup {
            window_ref: Some(handle.to_string()),
            window_name: Some(window.name),
            starts_at: Some(start),
            ends_at: Some(end),
        })
    }

    /// Fetches an order with its items and groups.
    pub async fn get_order(&self, order_id: Uuid) -> Result<CreateOrderResult, ServiceError> {
        let db = &*self.db;
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let planned_shipments = planned_shipment::Entity::find()
            .filter(planned_shipment::Column::OrderId.eq(order_id))
            .all(db)
            .await?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await?;
        Ok(CreateOrderResult {
            order,
            planned_shipments,
            items,
        })
    }

    /// Resolves an order number to its id, for lookups by human reference.
    pub async fn find_order_id_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Uuid>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .map(|o| o.id))
    }

    /// Lists order headers, newest first, with optional status and lifecycle
    /// filters.
    pub async fn list_orders(&self, query: &OrderListQuery) -> Result<OrderPage, ServiceError> {
        let mut select = order::Entity::find();
        if let Some(status) = query.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        let lifecycle = query.lifecycle.unwrap_or(OrderLifecycle::Active);
        select = select
            .filter(order::Column::Lifecycle.eq(lifecycle))
            .order_by_desc(order::Column::CreatedAt);

        let page = query.page.max(1);
        let limit = query.limit.clamp(1, 200);
        let paginator = select.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(OrderPage {
            orders,
            total,
            page,
            limit,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<OrderStatus>,
    pub lifecycle: Option<OrderLifecycle>,
}

impl Default for OrderListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            status: None,
            lifecycle: None,
        }
    }
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

fn prepared_item(
    item: &CreateOrderItem,
    variant: &product_variant::Model,
    group_index: usize,
) -> PreparedItem {
    PreparedItem {
        variant_id: variant.id,
        sku: variant.sku.clone(),
        name: variant.name.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price.unwrap_or(variant.price),
        group_index,
    }
}
