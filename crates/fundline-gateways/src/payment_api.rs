//! Payment processor client.
//!
//! Implements [`PaymentGateway`] by posting the intent's client secret to
//! the processor's confirm endpoint. Declines and processor failures come
//! back with a message that is surfaced verbatim to the payment step.
//! Off-session redirect flows are not part of the terminal surface.

use crate::http;
use async_trait::async_trait;
use fundline_core::error::{FundlineError, Result};
use fundline_core::gateway::PaymentGateway;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client for the payment processor's confirm endpoint.
#[derive(Clone)]
pub struct PaymentApiClient {
    client: Client,
    base_url: String,
}

impl PaymentApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FundlineError::internal(format!("HTTP client setup failed: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PaymentGateway for PaymentApiClient {
    async fn confirm_payment(&self, client_secret: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/payments/confirm"))
            .json(&ConfirmPaymentRequest { client_secret })
            .send()
            .await
            .map_err(http::map_transport)?;

        if !response.status().is_success() {
            return Err(map_confirm_error(response).await);
        }
        Ok(())
    }
}

/// Processor failures carry `{"error": {"message": ...}}`; anything else
/// falls back to the shared detail/verbatim handling.
async fn map_confirm_error(response: reqwest::Response) -> FundlineError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    FundlineError::gateway(
        status.as_u16(),
        confirm_error_message(status, &body),
        http::is_retryable(status),
    )
}

fn confirm_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(wrapper) = serde_json::from_str::<ErrorResponse>(body) {
        return wrapper.error.message;
    }
    http::error_message(status, body)
}

#[derive(Serialize)]
struct ConfirmPaymentRequest<'a> {
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_error_shape_is_unwrapped() {
        let message = confirm_error_message(
            StatusCode::PAYMENT_REQUIRED,
            r#"{"error": {"message": "Your card was declined."}}"#,
        );
        assert_eq!(message, "Your card was declined.");
    }

    #[test]
    fn other_bodies_fall_back_to_shared_handling() {
        let message = confirm_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "No such payment intent"}"#,
        );
        assert_eq!(message, "No such payment intent");
    }
}
