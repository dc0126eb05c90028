//! Donation session domain model.
//!
//! This module contains the session entity the wizard operates on. The
//! session is a singleton with process lifetime; nothing here is persisted.

use super::step::{AuthMode, DonationStep};
use serde::{Deserialize, Serialize};

/// The authenticated donor, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorIdentity {
    pub user_id: String,
    pub username: String,
}

/// A payment-provider handle authorizing collection of a specific amount.
///
/// Created fresh each time the payment step is entered; discarded when the
/// modal closes or the amount changes. The secret is opaque to everything
/// except the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationIntent {
    pub client_secret: String,
    pub amount_minor: i64,
}

/// Converts a dollar amount to minor units (cents) the way the ledger and
/// payment APIs expect it.
pub fn minor_units(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

/// The complete donation wizard state.
///
/// Invariants maintained by [`SessionStore`](super::SessionStore):
/// - `is_authenticated == user.is_some()` after every mutation.
/// - `intent` never outlives the amount it was created for.
/// - `generation` increases monotonically; a bump means every in-flight
///   gateway result for the previous session must be discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationSession {
    /// Whether the donation modal is visible.
    pub modal_open: bool,
    /// Selected donation amount in dollars. Zero until the donor picks one.
    pub amount: f64,
    /// Current wizard step.
    pub step: DonationStep,
    /// Sub-mode within the auth step.
    pub auth_mode: AuthMode,
    /// Present iff the donor is authenticated.
    pub user: Option<DonorIdentity>,
    /// Kept consistent with `user` by the store.
    pub is_authenticated: bool,
    /// Payment intent for the current amount, if one has been created.
    pub intent: Option<DonationIntent>,
    /// Address a confirmation code was sent to, for display in Confirm mode.
    pub pending_email: Option<String>,
    /// Reset counter used to discard late-arriving gateway results.
    pub generation: u64,
}

impl Default for DonationSession {
    fn default() -> Self {
        Self {
            modal_open: false,
            amount: 0.0,
            step: DonationStep::Amount,
            auth_mode: AuthMode::SignIn,
            user: None,
            is_authenticated: false,
            intent: None,
            pending_email: None,
            generation: 0,
        }
    }
}

impl DonationSession {
    /// The selected amount in minor units.
    pub fn amount_minor(&self) -> i64 {
        minor_units(self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_rounds_like_the_wire_format() {
        assert_eq!(minor_units(25.0), 2500);
        assert_eq!(minor_units(10.5), 1050);
        assert_eq!(minor_units(24.99), 2499);
        assert_eq!(minor_units(0.0), 0);
    }

    #[test]
    fn default_session_starts_at_amount_step() {
        let session = DonationSession::default();
        assert_eq!(session.step, DonationStep::Amount);
        assert_eq!(session.amount, 0.0);
        assert!(!session.modal_open);
        assert!(!session.is_authenticated);
    }
}
