use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One order line. `planned_shipment_id` is nullable only transiently: the
/// decomposition engine assigns every item to a group before commit.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    /// Quantity cancelled after ordering; excluded from coverage checks.
    pub cancelled_quantity: i32,
    pub unit_price: Decimal,
    pub planned_shipment_id: Option<Uuid>,
    /// External line-item reference recorded at transfer time, preferred for
    /// reconciliation matching.
    pub external_line_id: Option<String>,
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
    #[sea_orm(
        belongs_to = "super::planned_shipment::Entity",
        from = "Column::PlannedShipmentId",
        to = "super::planned_shipment::Column::Id"
    )]
    PlannedShipment,
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    ProductVariant,
    #[sea_orm(has_many = "super::shipment_item::Entity")]
    ShipmentItems,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::planned_shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlannedShipment.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl Related<super::shipment_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Quantity still expected to ship, before counting recorded shipments.
    pub fn effective_quantity(&self) -> i32 {
        self.quantity - self.cancelled_quantity
    }
}
