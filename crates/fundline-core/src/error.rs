//! Error types for the Fundline application.
//!
//! Every failure a donation flow can surface is one of the variants below.
//! The step-level variants (`Validation`, `Auth`, `Intent`, `Payment`) carry
//! the human-readable line the UI prints inline; `Gateway` is the raw
//! adapter-level shape that the flow controller maps into a step-level
//! variant before it reaches a caller.

use thiserror::Error;

/// A shared error type for the entire Fundline application.
#[derive(Error, Debug, Clone)]
pub enum FundlineError {
    /// Locally rejected input (non-positive or missing amount). No network
    /// call was made.
    #[error("{0}")]
    Validation(String),

    /// Sign-in/sign-up/confirmation failure. The session stays in the auth
    /// step and the user may retry or switch modes.
    #[error("{0}")]
    Auth(String),

    /// The ledger backend rejected intent creation, or the request failed
    /// on the way there.
    #[error("{0}")]
    Intent(String),

    /// Payment confirmation failed. The session stays in the payment step
    /// and the user may resubmit.
    #[error("{0}")]
    Payment(String),

    /// Transport/status-level failure from an external service, before the
    /// flow controller has assigned it to a step.
    #[error("gateway error: {message}")]
    Gateway {
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        message: String,
        /// Whether retrying the same request may succeed (timeouts,
        /// connection failures, 5xx).
        retryable: bool,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FundlineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn intent(message: impl Into<String>) -> Self {
        Self::Intent(message.into())
    }

    pub fn payment(message: impl Into<String>) -> Self {
        Self::Payment(message.into())
    }

    /// Creates a `Gateway` error for a failure with no HTTP status
    /// (connection refused, DNS, timeout).
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        Self::Gateway {
            status: None,
            message: message.into(),
            retryable,
        }
    }

    /// Creates a `Gateway` error carrying the server's status and message.
    pub fn gateway(status: u16, message: impl Into<String>, retryable: bool) -> Self {
        Self::Gateway {
            status: Some(status),
            message: message.into(),
            retryable,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if retrying the failed call may succeed.
    ///
    /// Step-level errors are always retryable from the step they occurred
    /// in; only `Gateway` distinguishes, based on how the request failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway { retryable, .. } => *retryable,
            Self::Validation(_) | Self::Auth(_) | Self::Intent(_) | Self::Payment(_) => true,
            _ => false,
        }
    }

    /// The line shown to the user, without any variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(m)
            | Self::Auth(m)
            | Self::Intent(m)
            | Self::Payment(m)
            | Self::Config(m)
            | Self::Internal(m) => m.clone(),
            Self::Gateway { message, .. } => message.clone(),
            Self::Io { message } => message.clone(),
        }
    }
}

impl From<std::io::Error> for FundlineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for FundlineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// A type alias for `Result<T, FundlineError>`.
pub type Result<T> = std::result::Result<T, FundlineError>;
