//! Donation ledger backend client.
//!
//! Implements [`LedgerGateway`] over the backend's JSON API:
//! `GET /donations/total`, `GET /donations/recent` and
//! `POST /donations/create-intent`. The authorization header is attached to
//! intent creation only when the caller holds a session token; the read
//! endpoints are public.

use crate::http;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fundline_core::error::{FundlineError, Result};
use fundline_core::feed::LogEntry;
use fundline_core::gateway::LedgerGateway;
use fundline_core::session::DonationIntent;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// HTTP client for the donation ledger backend.
#[derive(Clone)]
pub struct LedgerApiClient {
    client: Client,
    base_url: String,
}

impl LedgerApiClient {
    /// Creates a client against `base_url` with a per-request timeout.
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
impl LedgerGateway for LedgerApiClient {
    async fn total_raised(&self) -> Result<f64> {
        let response = self
            .client
            .get(self.url("/donations/total"))
            .send()
            .await
            .map_err(http::map_transport)?;

        if !response.status().is_success() {
            return Err(http::error_for(response).await);
        }

        let parsed: TotalDonationResponse = response.json().await.map_err(http::map_transport)?;
        Ok(parsed.total_amount_dollars)
    }

    async fn recent_donations(&self) -> Result<Vec<LogEntry>> {
        let response = self
            .client
            .get(self.url("/donations/recent"))
            .send()
            .await
            .map_err(http::map_transport)?;

        if !response.status().is_success() {
            return Err(http::error_for(response).await);
        }

        let parsed: Vec<PublicDonationResponse> =
            response.json().await.map_err(http::map_transport)?;
        Ok(parsed.into_iter().map(LogEntry::from).collect())
    }

    async fn create_intent(&self, amount_minor: i64, token: Option<&str>) -> Result<DonationIntent> {
        let mut request = self
            .client
            .post(self.url("/donations/create-intent"))
            .header("x-request-id", Uuid::new_v4().to_string())
            .json(&DonationIntentRequest {
                amount: amount_minor,
            });

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(http::map_transport)?;

        if !response.status().is_success() {
            return Err(http::error_for(response).await);
        }

        let parsed: DonationIntentResponse = response.json().await.map_err(http::map_transport)?;
        Ok(DonationIntent {
            client_secret: parsed.client_secret,
            amount_minor,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TotalDonationResponse {
    total_amount_dollars: f64,
}

#[derive(Debug, Deserialize)]
struct PublicDonationResponse {
    donor_name: String,
    /// Minor units (cents).
    amount: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl From<PublicDonationResponse> for LogEntry {
    fn from(dto: PublicDonationResponse) -> Self {
        Self {
            created_at: dto.created_at,
            donor_label: dto.donor_name,
            amount_cents: dto.amount,
            currency: dto.currency,
        }
    }
}

#[derive(Debug, Serialize)]
struct DonationIntentRequest {
    /// Minor units (cents).
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct DonationIntentResponse {
    client_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_response_parses() {
        let parsed: TotalDonationResponse =
            serde_json::from_str(r#"{"total_amount_dollars": 1250.5}"#).unwrap();
        assert_eq!(parsed.total_amount_dollars, 1250.5);
    }

    #[test]
    fn recent_response_parses_into_log_entries() {
        let parsed: Vec<PublicDonationResponse> = serde_json::from_str(
            r#"[
                {"donor_name": "Sarah_M", "amount": 1000, "currency": "usd",
                 "created_at": "2023-10-27T13:45:12Z"},
                {"donor_name": "Anonymous", "amount": 2500, "currency": "usd",
                 "created_at": "2023-10-27T14:00:23Z"}
            ]"#,
        )
        .unwrap();

        let entries: Vec<LogEntry> = parsed.into_iter().map(LogEntry::from).collect();
        assert_eq!(entries[0].donor_label, "Sarah_M");
        assert_eq!(entries[0].amount_cents, 1000);
        assert!(entries[1].is_anonymous());
    }

    #[test]
    fn intent_response_parses() {
        let parsed: DonationIntentResponse =
            serde_json::from_str(r#"{"client_secret": "pi_123_secret_456"}"#).unwrap();
        assert_eq!(parsed.client_secret, "pi_123_secret_456");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client =
            LedgerApiClient::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.url("/donations/total"),
            "http://localhost:8000/donations/total"
        );
    }
}
