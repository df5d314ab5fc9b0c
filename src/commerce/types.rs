//! Wire payloads exchanged with the commerce platform.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalOrderPayload {
    pub order_number: String,
    /// External customer reference, when already known locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub customer: ExternalCustomerPayload,
    pub currency: String,
    pub shipping_address: String,
    pub billing_address: String,
    /// Descriptive tags derived from order type and window names.
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub line_items: Vec<ExternalLinePayload>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalLinePayload {
    /// Local order item id, echoed back so line references can be recorded.
    pub reference: Uuid,
    pub variant_id: String,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalOrderRef {
    pub id: String,
    #[serde(default)]
    pub line_items: Vec<ExternalLineRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalLineRef {
    pub id: String,
    /// Echo of [`ExternalLinePayload::reference`], if the platform returns it.
    #[serde(default)]
    pub reference: Option<Uuid>,
    #[serde(default)]
    pub variant_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalCustomerPayload {
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalCustomerRef {
    pub id: String,
}

/// Fulfillment record pulled from the platform during reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalFulfillment {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tracking: Vec<ExternalTracking>,
    pub line_items: Vec<ExternalFulfillmentLine>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalTracking {
    #[serde(default)]
    pub carrier: Option<String>,
    pub number: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalFulfillmentLine {
    /// Platform line-item id; preferred match against
    /// `order_item.external_line_id`.
    #[serde(default)]
    pub line_item_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i32,
}

/// Fulfillment pushed to the platform when mirroring a local shipment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalFulfillmentPayload {
    pub shipped_at: DateTime<Utc>,
    pub tracking: Vec<ExternalTracking>,
    pub line_items: Vec<ExternalFulfillmentLine>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalOrderState {
    pub status: String,
}

impl ExternalOrderState {
    /// True when the platform considers this order finished (cancelled or
    /// closed), which gates local trashing of transferred orders.
    pub fn is_settled(&self) -> bool {
        matches!(self.status.as_str(), "cancelled" | "closed")
    }
}
