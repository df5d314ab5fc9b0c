//! External commerce platform boundary.
//!
//! Every call returns a typed result and is converted to internal types
//! immediately; platform JSON never leaks past this module. The production
//! implementation is [`client::RestCommerceClient`]; tests script the
//! [`CommercePlatform`] trait directly.

pub mod client;
pub mod types;

use async_trait::async_trait;

use types::{
    ExternalCustomerPayload, ExternalCustomerRef, ExternalFulfillment, ExternalFulfillmentPayload,
    ExternalOrderPayload, ExternalOrderRef, ExternalOrderState,
};

/// Tagged failure type for platform calls. `NotFound` is distinguishable so
/// callers can react to missing entities (e.g. create-customer-then-retry).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommerceError {
    #[error("entity not found")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("request timed out")]
    Timeout,
    #[error("payload rejected: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

pub type CommerceResult<T> = Result<T, CommerceError>;

/// Operations the engine consumes from the commerce platform.
#[async_trait]
pub trait CommercePlatform: Send + Sync {
    async fn create_order(&self, order: &ExternalOrderPayload) -> CommerceResult<ExternalOrderRef>;

    async fn cancel_order(&self, external_id: &str) -> CommerceResult<()>;

    async fn close_order(&self, external_id: &str) -> CommerceResult<()>;

    async fn create_customer(
        &self,
        customer: &ExternalCustomerPayload,
    ) -> CommerceResult<ExternalCustomerRef>;

    async fn create_fulfillment(
        &self,
        external_order_id: &str,
        fulfillment: &ExternalFulfillmentPayload,
    ) -> CommerceResult<String>;

    async fn list_fulfillments(
        &self,
        external_order_id: &str,
    ) -> CommerceResult<Vec<ExternalFulfillment>>;

    async fn get_order_state(&self, external_id: &str) -> CommerceResult<ExternalOrderState>;
}
