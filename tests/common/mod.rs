//! Shared harness for integration tests: in-memory database setup, catalog
//! seeding and a scripted commerce platform.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use wholesale_api::{
    commerce::{
        types::{
            ExternalCustomerPayload, ExternalCustomerRef, ExternalFulfillment,
            ExternalFulfillmentPayload, ExternalLineRef, ExternalOrderPayload, ExternalOrderRef,
            ExternalOrderState,
        },
        CommerceError, CommercePlatform, CommerceResult,
    },
    db::DbPool,
    entities::{delivery_window, product_variant},
    migrator::Migrator,
    models::OrderType,
    services::{customers::CustomerDetails, orders::CreateOrderItem, orders::CreateOrderRequest},
};

/// Fresh in-memory database with the full schema applied. A single pooled
/// connection keeps the in-memory database alive for the test's duration.
pub async fn setup_db() -> Arc<DbPool> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("database connects");
    Migrator::up(&db, None).await.expect("migrations apply");
    Arc::new(db)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn seed_window(
    db: &DbPool,
    handle: &str,
    name: &str,
    starts_at: Option<NaiveDate>,
    ends_at: Option<NaiveDate>,
) -> delivery_window::Model {
    delivery_window::ActiveModel {
        id: Set(Uuid::new_v4()),
        handle: Set(handle.to_string()),
        name: Set(name.to_string()),
        starts_at: Set(starts_at),
        ends_at: Set(ends_at),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("window inserts")
}

pub async fn seed_variant(
    db: &DbPool,
    sku: &str,
    order_type: OrderType,
    window_ref: Option<&str>,
    external_variant_id: Option<&str>,
    price: Decimal,
) -> product_variant::Model {
    product_variant::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(format!("Product {}", sku)),
        order_type: Set(order_type),
        window_ref: Set(window_ref.map(str::to_string)),
        external_variant_id: Set(external_variant_id.map(str::to_string)),
        external_product_id: Set(None),
        price: Set(price),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("variant inserts")
}

pub fn buyer() -> CustomerDetails {
    CustomerDetails {
        email: "buyer@example.com".to_string(),
        name: "Test Buyer".to_string(),
        phone: None,
        shipping_address: "1 Warehouse Way".to_string(),
        billing_address: "1 Warehouse Way".to_string(),
    }
}

pub fn line(sku: &str, quantity: i32) -> CreateOrderItem {
    CreateOrderItem {
        sku: sku.to_string(),
        quantity,
        unit_price: None,
        window_ref: None,
    }
}

pub fn order_request(items: Vec<CreateOrderItem>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer: buyer(),
        currency: "USD".to_string(),
        items,
        plan: None,
        notes: None,
    }
}

/// Scripted commerce platform. Every call is recorded; responses come from
/// fields the test sets up front.
#[derive(Default)]
pub struct MockCommerce {
    counter: AtomicU64,
    /// Names of calls made, in order.
    pub calls: Mutex<Vec<String>>,
    pub created_orders: Mutex<Vec<ExternalOrderPayload>>,
    pub created_fulfillments: Mutex<Vec<(String, ExternalFulfillmentPayload)>>,
    /// When set, the next `create_order` fails once with `NotFound`,
    /// simulating a stale external customer reference.
    pub reject_customer_once: AtomicBool,
    /// When set, every `create_order` fails with the given error.
    pub fail_create_order: Mutex<Option<CommerceError>>,
    /// When set, cancel/close calls fail.
    pub fail_settlement: Mutex<Option<CommerceError>>,
    /// When set, `list_fulfillments` fails.
    pub fail_list_fulfillments: Mutex<Option<CommerceError>>,
    /// Fulfillments returned by `list_fulfillments`.
    pub fulfillments: Mutex<Vec<ExternalFulfillment>>,
    /// Status returned by `get_order_state`.
    pub order_state: Mutex<String>,
}

impl MockCommerce {
    pub fn new() -> Arc<Self> {
        let mock = Self {
            order_state: Mutex::new("open".to_string()),
            ..Self::default()
        };
        Arc::new(mock)
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn set_order_state(&self, status: &str) {
        *self.order_state.lock().unwrap() = status.to_string();
    }

    pub fn push_fulfillment(&self, fulfillment: ExternalFulfillment) {
        self.fulfillments.lock().unwrap().push(fulfillment);
    }
}

#[async_trait]
impl CommercePlatform for MockCommerce {
    async fn create_order(&self, order: &ExternalOrderPayload) -> CommerceResult<ExternalOrderRef> {
        self.record("create_order");
        if let Some(err) = self.fail_create_order.lock().unwrap().clone() {
            return Err(err);
        }
        if self.reject_customer_once.swap(false, Ordering::SeqCst) {
            return Err(CommerceError::NotFound);
        }
        self.created_orders.lock().unwrap().push(order.clone());
        let line_items = order
            .line_items
            .iter()
            .map(|line| ExternalLineRef {
                id: self.next_id("line"),
                reference: Some(line.reference),
                variant_id: Some(line.variant_id.clone()),
            })
            .collect();
        Ok(ExternalOrderRef {
            id: self.next_id("ext-order"),
            line_items,
        })
    }

    async fn cancel_order(&self, _external_id: &str) -> CommerceResult<()> {
        self.record("cancel_order");
        if let Some(err) = self.fail_settlement.lock().unwrap().clone() {
            return Err(err);
        }
        self.set_order_state("cancelled");
        Ok(())
    }

    async fn close_order(&self, _external_id: &str) -> CommerceResult<()> {
        self.record("close_order");
        if let Some(err) = self.fail_settlement.lock().unwrap().clone() {
            return Err(err);
        }
        self.set_order_state("closed");
        Ok(())
    }

    async fn create_customer(
        &self,
        _customer: &ExternalCustomerPayload,
    ) -> CommerceResult<ExternalCustomerRef> {
        self.record("create_customer");
        Ok(ExternalCustomerRef {
            id: self.next_id("ext-customer"),
        })
    }

    async fn create_fulfillment(
        &self,
        external_order_id: &str,
        fulfillment: &ExternalFulfillmentPayload,
    ) -> CommerceResult<String> {
        self.record("create_fulfillment");
        let id = self.next_id("ext-fulfillment");
        self.created_fulfillments
            .lock()
            .unwrap()
            .push((external_order_id.to_string(), fulfillment.clone()));
        Ok(id)
    }

    async fn list_fulfillments(
        &self,
        _external_order_id: &str,
    ) -> CommerceResult<Vec<ExternalFulfillment>> {
        self.record("list_fulfillments");
        if let Some(err) = self.fail_list_fulfillments.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.fulfillments.lock().unwrap().clone())
    }

    async fn get_order_state(&self, _external_id: &str) -> CommerceResult<ExternalOrderState> {
        self.record("get_order_state");
        Ok(ExternalOrderState {
            status: self.order_state.lock().unwrap().clone(),
        })
    }
}
