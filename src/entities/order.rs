use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{OrderLifecycle, OrderStatus, OrderType};

/// Order header. The order number is immutable once assigned; window bounds
/// are a cache derived from the order's planned shipments.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    pub order_type: OrderType,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub lifecycle: OrderLifecycle,

    pub total_amount: Decimal,
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,

    pub shipping_address: String,
    pub billing_address: String,

    /// Cached min(starts_at) across this order's planned shipments.
    pub window_start: Option<NaiveDate>,
    /// Cached max(ends_at) across this order's planned shipments.
    pub window_end: Option<NaiveDate>,

    /// Set exactly once, by the outbound transfer.
    pub transferred: bool,
    pub external_id: Option<String>,
    /// Last status observed on the external platform, refreshed by inbound sync.
    pub external_status: Option<String>,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::planned_shipment::Entity")]
    PlannedShipments,
    #[sea_orm(has_many = "super::shipment::Entity")]
    Shipments,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::planned_shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlannedShipments.def()
    }
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipments.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_editable(&self) -> bool {
        !self.status.is_terminal() && self.lifecycle == OrderLifecycle::Active
    }
}
