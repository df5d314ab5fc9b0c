use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical shipment that left the warehouse. Immutable once created,
/// except for cost/date/note corrections and the `voided` marker. Voided
/// shipments are excluded from every aggregate recomputation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    /// Set when every recorded line came from one planned shipment group.
    pub planned_shipment_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub shipped_at: DateTime<Utc>,
    /// External fulfillment reference; unique per order, used to dedup
    /// inbound reconciliation.
    pub external_fulfillment_id: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub voided: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(has_many = "super::shipment_item::Entity")]
    ShipmentItems,
    #[sea_orm(has_many = "super::shipment_tracking::Entity")]
    Trackings,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::shipment_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentItems.def()
    }
}

impl Related<super::shipment_tracking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trackings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
