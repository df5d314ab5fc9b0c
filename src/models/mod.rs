//! Shared domain enums used across entities and services.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// `Invoiced` and `Cancelled` are terminal: once reached, no further status
/// mutation, item edit, or group reassignment is permitted.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "PartiallyShipped")]
    PartiallyShipped,
    #[sea_orm(string_value = "Shipped")]
    Shipped,
    #[sea_orm(string_value = "Invoiced")]
    Invoiced,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Invoiced | OrderStatus::Cancelled)
    }
}

/// Availability classification of an order or line item.
///
/// Always derived from the catalog (`product_variant.order_type`), never
/// taken from client-supplied flags.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum,
    Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OrderType {
    #[sea_orm(string_value = "Stock")]
    Stock,
    #[sea_orm(string_value = "PreOrder")]
    PreOrder,
}

impl OrderType {
    /// Order-number prefix for this type.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            OrderType::Stock => "SO",
            OrderType::PreOrder => "PR",
        }
    }
}

/// Fulfillment progress of a planned shipment group.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PlannedShipmentStatus {
    #[sea_orm(string_value = "Planned")]
    Planned,
    #[sea_orm(string_value = "PartiallyFulfilled")]
    PartiallyFulfilled,
    #[sea_orm(string_value = "Fulfilled")]
    Fulfilled,
}

/// Archival lifecycle, independent of [`OrderStatus`].
///
/// Only terminal-status orders may leave `Active`; permanent removal is a
/// separate guarded deletion, not a state.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OrderLifecycle {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Archived")]
    Archived,
    #[sea_orm(string_value = "Trashed")]
    Trashed,
}

/// Identity of the operator performing a mutating call, threaded explicitly
/// into every service method rather than read from ambient state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestContext {
    pub actor: String,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn system() -> Self {
        Self {
            actor: "system".to_string(),
        }
    }
}
