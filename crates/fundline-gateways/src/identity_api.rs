//! Hosted identity service client.
//!
//! Implements [`IdentityGateway`] against an HTTP auth service exposing the
//! usual hosted-provider surface: sign-up with emailed confirmation codes,
//! sign-in issuing a bearer token, and a "who am I" endpoint. The session
//! token lives in memory only; a fresh process starts signed out.
//!
//! Auth state changes are pushed to observers over a broadcast channel so
//! the rest of the application reacts to sign-ins and sign-outs it did not
//! initiate itself.

use crate::http;
use async_trait::async_trait;
use fundline_core::error::{FundlineError, Result};
use fundline_core::gateway::{AuthEvent, IdentityGateway, SignUpOutcome};
use fundline_core::session::DonorIdentity;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

/// HTTP client for the identity provider.
pub struct IdentityApiClient {
    client: Client,
    base_url: String,
    /// Bearer token for the signed-in session; memory only.
    token: RwLock<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
}

impl IdentityApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FundlineError::internal(format!("HTTP client setup failed: {err}")))?;
        let (events, _) = broadcast::channel(16);
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            events,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn publish(&self, event: AuthEvent) {
        // Nobody listening is fine; the channel only matters once the flow
        // controller has subscribed.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl IdentityGateway for IdentityApiClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<SignUpOutcome> {
        let response = self
            .client
            .post(self.url("/auth/sign-up"))
            .json(&SignUpRequest {
                email,
                password,
                name,
            })
            .send()
            .await
            .map_err(http::map_transport)?;

        if !response.status().is_success() {
            return Err(http::error_for(response).await);
        }

        let parsed: SignUpResponse = response.json().await.map_err(http::map_transport)?;
        if parsed.confirmation_required {
            Ok(SignUpOutcome::ConfirmationRequired)
        } else {
            Ok(SignUpOutcome::Complete)
        }
    }

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/auth/confirm"))
            .json(&ConfirmRequest { email, code })
            .send()
            .await
            .map_err(http::map_transport)?;

        if !response.status().is_success() {
            return Err(http::error_for(response).await);
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/auth/sign-in"))
            .json(&SignInRequest { email, password })
            .send()
            .await
            .map_err(http::map_transport)?;

        if !response.status().is_success() {
            return Err(http::error_for(response).await);
        }

        let parsed: SignInResponse = response.json().await.map_err(http::map_transport)?;
        *self.token.write().await = Some(parsed.id_token);
        self.publish(AuthEvent::SignedIn);
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.token.read().await.clone();

        if let Some(token) = token {
            let response = self
                .client
                .post(self.url("/auth/sign-out"))
                .bearer_auth(token)
                .send()
                .await
                .map_err(http::map_transport)?;

            if !response.status().is_success() {
                return Err(http::error_for(response).await);
            }
        }

        *self.token.write().await = None;
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<DonorIdentity>> {
        let token = self.token.read().await.clone();
        let Some(token) = token else {
            return Ok(None);
        };

        let response = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(http::map_transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("session token no longer accepted, clearing local session");
            *self.token.write().await = None;
            self.publish(AuthEvent::TokenRefreshFailed);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(http::error_for(response).await);
        }

        let parsed: MeResponse = response.json().await.map_err(http::map_transport)?;
        Ok(Some(DonorIdentity {
            user_id: parsed.user_id,
            username: parsed.username,
        }))
    }

    async fn id_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    confirmation_required: bool,
}

#[derive(Serialize)]
struct ConfirmRequest<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct MeResponse {
    user_id: String,
    username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_response_defaults_to_complete() {
        let parsed: SignUpResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(!parsed.confirmation_required);
    }

    #[test]
    fn sign_in_response_ignores_extra_fields() {
        let parsed: SignInResponse = serde_json::from_str(
            r#"{"id_token": "t-1", "user_id": "u-1", "username": "sarah@example.com"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id_token, "t-1");
    }

    #[tokio::test]
    async fn starts_signed_out_with_no_token() {
        let client =
            IdentityApiClient::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
        assert!(client.id_token().await.is_none());
        assert!(client.current_user().await.unwrap().is_none());
    }

    #[test]
    fn optional_name_is_omitted_from_the_payload() {
        let body = serde_json::to_string(&SignUpRequest {
            email: "a@b.c",
            password: "pw",
            name: None,
        })
        .unwrap();
        assert!(!body.contains("name"));
    }
}
