//! Pricing backend client
//!
//! The controller only depends on the [`PricingPreviewFetcher`] trait; the
//! reqwest implementation below talks to the real pricing service.
//! Cancellation is cooperative: dropping the returned future aborts the
//! underlying HTTP request.

use async_trait::async_trait;
use core_config::pricing_api::PricingApiConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::PreviewFetchError;
use crate::models::{PricingPreview, QuotePayload};

/// Remote pricing computation, scoped either to a persisted booking or to an
/// anonymous quote payload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricingPreviewFetcher: Send + Sync {
    /// Price a persisted booking with the given credit applied
    async fn fetch_booking_preview(
        &self,
        booking_id: &str,
        credit_cents: i64,
    ) -> Result<PricingPreview, PreviewFetchError>;

    /// Price an anonymous quote (no booking id yet)
    async fn fetch_quote_preview(
        &self,
        payload: &QuotePayload,
    ) -> Result<PricingPreview, PreviewFetchError>;
}

#[async_trait]
impl<T: PricingPreviewFetcher + ?Sized> PricingPreviewFetcher for std::sync::Arc<T> {
    async fn fetch_booking_preview(
        &self,
        booking_id: &str,
        credit_cents: i64,
    ) -> Result<PricingPreview, PreviewFetchError> {
        (**self).fetch_booking_preview(booking_id, credit_cents).await
    }

    async fn fetch_quote_preview(
        &self,
        payload: &QuotePayload,
    ) -> Result<PricingPreview, PreviewFetchError> {
        (**self).fetch_quote_preview(payload).await
    }
}

/// Structured problem body the pricing API returns on rejection
#[derive(Debug, Deserialize)]
struct ApiProblemBody {
    detail: Option<String>,
}

/// HTTP client for the pricing backend
pub struct HttpPricingClient {
    client: Client,
    base_url: String,
}

impl HttpPricingClient {
    pub fn new(config: PricingApiConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url,
        }
    }

    async fn post_preview(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<PricingPreview, PreviewFetchError> {
        debug!(%url, "Requesting pricing preview");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PreviewFetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let problem: Option<ApiProblemBody> = response.json().await.ok();
            if let Some(detail) = problem.and_then(|p| p.detail) {
                return Err(PreviewFetchError::ApiProblem {
                    detail,
                    status: Some(status.as_u16()),
                });
            }
            return Err(PreviewFetchError::Transport(format!(
                "Pricing API returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PreviewFetchError::Transport(e.to_string()))
    }
}

#[async_trait]
impl PricingPreviewFetcher for HttpPricingClient {
    async fn fetch_booking_preview(
        &self,
        booking_id: &str,
        credit_cents: i64,
    ) -> Result<PricingPreview, PreviewFetchError> {
        let url = format!("{}/bookings/{}/pricing-preview", self.base_url, booking_id);
        self.post_preview(url, json!({ "creditCents": credit_cents }))
            .await
    }

    async fn fetch_quote_preview(
        &self,
        payload: &QuotePayload,
    ) -> Result<PricingPreview, PreviewFetchError> {
        let url = format!("{}/pricing/quote", self.base_url);
        let body = serde_json::to_value(payload)
            .map_err(|e| PreviewFetchError::Transport(e.to_string()))?;
        self.post_preview(url, body).await
    }
}
