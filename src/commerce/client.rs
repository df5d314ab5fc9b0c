//! REST client for the commerce platform.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{
    types::{
        ExternalCustomerPayload, ExternalCustomerRef, ExternalFulfillment,
        ExternalFulfillmentPayload, ExternalOrderPayload, ExternalOrderRef, ExternalOrderState,
    },
    CommerceError, CommercePlatform, CommerceResult,
};
use crate::config::CommerceConfig;

#[derive(Clone, Debug)]
pub struct RestCommerceClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl RestCommerceClient {
    pub fn new(config: &CommerceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> CommerceResult<T> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> CommerceResult<T> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode(response).await
    }
}

fn map_transport_error(err: reqwest::Error) -> CommerceError {
    if err.is_timeout() {
        CommerceError::Timeout
    } else {
        CommerceError::Transport(err.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> CommerceResult<T> {
    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => Err(CommerceError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(CommerceError::RateLimited),
        s if s.is_success() => response
            .json::<T>()
            .await
            .map_err(|e| CommerceError::Transport(format!("malformed response body: {}", e))),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(CommerceError::Rejected(format!("{}: {}", status, body)))
        }
    }
}

#[async_trait::async_trait]
impl CommercePlatform for RestCommerceClient {
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn create_order(&self, order: &ExternalOrderPayload) -> CommerceResult<ExternalOrderRef> {
        let created: ExternalOrderRef = self.post("/orders", order).await?;
        debug!(external_id = %created.id, "external order created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, external_id: &str) -> CommerceResult<()> {
        self.post::<_, serde_json::Value>(&format!("/orders/{}/cancel", external_id), &())
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn close_order(&self, external_id: &str) -> CommerceResult<()> {
        self.post::<_, serde_json::Value>(&format!("/orders/{}/close", external_id), &())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, customer), fields(email = %customer.email))]
    async fn create_customer(
        &self,
        customer: &ExternalCustomerPayload,
    ) -> CommerceResult<ExternalCustomerRef> {
        self.post("/customers", customer).await
    }

    #[instrument(skip(self, fulfillment))]
    async fn create_fulfillment(
        &self,
        external_order_id: &str,
        fulfillment: &ExternalFulfillmentPayload,
    ) -> CommerceResult<String> {
        let created: ExternalFulfillment = self
            .post(
                &format!("/orders/{}/fulfillments", external_order_id),
                fulfillment,
            )
            .await?;
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn list_fulfillments(
        &self,
        external_order_id: &str,
    ) -> CommerceResult<Vec<ExternalFulfillment>> {
        self.get(&format!("/orders/{}/fulfillments", external_order_id))
            .await
    }

    #[instrument(skip(self))]
    async fn get_order_state(&self, external_id: &str) -> CommerceResult<ExternalOrderState> {
        self.get(&format!("/orders/{}", external_id)).await
    }
}
