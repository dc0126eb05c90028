//! Shared HTTP failure mapping for the gateway adapters.
//!
//! The ledger backend answers failures with a JSON `{"detail": ...}` body
//! or plain text; either way the text is surfaced verbatim as the error
//! message.

use fundline_core::FundlineError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;

#[derive(Deserialize)]
struct DetailBody {
    detail: String,
}

/// Maps a transport-level failure (no HTTP response at all).
pub(crate) fn map_transport(err: reqwest::Error) -> FundlineError {
    FundlineError::transport(
        format!("request failed: {err}"),
        err.is_connect() || err.is_timeout(),
    )
}

pub(crate) fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Builds the error for a non-2xx response, consuming its body.
pub(crate) async fn error_for(response: Response) -> FundlineError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    FundlineError::gateway(
        status.as_u16(),
        error_message(status, &body),
        is_retryable(status),
    )
}

/// `{"detail": ...}` when the body parses as one, the raw body otherwise,
/// and a status line when there is no body at all.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<DetailBody>(body) {
        return parsed.detail;
    }
    if body.trim().is_empty() {
        format!("API error: {status}")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_bodies_are_unwrapped() {
        let message = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Amount must be positive"}"#,
        );
        assert_eq!(message, "Amount must be positive");
    }

    #[test]
    fn plain_text_bodies_pass_through_verbatim() {
        let message = error_message(StatusCode::BAD_GATEWAY, "upstream exploded");
        assert_eq!(message, "upstream exploded");
    }

    #[test]
    fn empty_bodies_fall_back_to_the_status_line() {
        let message = error_message(StatusCode::NOT_FOUND, "");
        assert_eq!(message, "API error: 404 Not Found");
    }
}
