//! External gateway contracts.
//!
//! The donation flow never talks to a network itself; it calls the traits
//! below. Concrete HTTP adapters live in `fundline-gateways`, mocks live
//! next to the tests that use them.

use crate::error::Result;
use crate::feed::LogEntry;
use crate::session::{DonationIntent, DonorIdentity};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Push notification from the identity provider.
///
/// Providers emit these when the authentication state changes outside the
/// wizard's own calls (another surface signed the user out, a token expired,
/// ...). The flow controller subscribes once at session start; dropping the
/// subscription unsubscribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshFailed,
}

/// What the provider wants next after a successful sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account is usable immediately.
    Complete,
    /// A verification code was sent and must be confirmed first.
    ConfirmationRequired,
}

/// Sign-up / sign-in / confirm / sign-out against the external identity
/// provider.
///
/// Implementations reduce provider-specific error shapes to a display
/// message; callers never inspect provider internals.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<SignUpOutcome>;

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<()>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    /// The currently authenticated donor, if any. `Ok(None)` means "not
    /// signed in", which is not an error.
    async fn current_user(&self) -> Result<Option<DonorIdentity>>;

    /// A session token for authorizing backend calls, when one is held.
    async fn id_token(&self) -> Option<String>;

    /// Registers an observer for auth state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Read queries and the intent command against the donation ledger backend.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Total raised so far, in dollars. Staleness up to the poll interval
    /// is acceptable.
    async fn total_raised(&self) -> Result<f64>;

    /// Recent donations, most-recent-first as delivered by the backend.
    /// The caller does not re-sort.
    async fn recent_donations(&self) -> Result<Vec<LogEntry>>;

    /// Creates a payment intent for `amount_minor` minor units, attaching
    /// the bearer token when one is available.
    async fn create_intent(
        &self,
        amount_minor: i64,
        token: Option<&str>,
    ) -> Result<DonationIntent>;
}

/// Confirms a charge against a previously created intent.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn confirm_payment(&self, client_secret: &str) -> Result<()>;
}
