//! Session state store.
//!
//! Holds the [`DonationSession`] and broadcasts a full snapshot to all
//! observers synchronously on every mutation. All operations are total and
//! never fail.
//!
//! Step and identity mutators are `pub(crate)`: only the flow controller in
//! this crate drives wizard transitions, so illegal transitions cannot be
//! issued from outside the crate at all.

use super::model::{DonationIntent, DonationSession, DonorIdentity};
use super::step::{AuthMode, DonationStep};
use tokio::sync::watch;

/// Process-wide holder of the donation wizard state.
///
/// Observers subscribe with [`SessionStore::subscribe`] and receive a cloned
/// snapshot after each change; readers that don't need change notification
/// use [`SessionStore::snapshot`].
pub struct SessionStore {
    tx: watch::Sender<DonationSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DonationSession::default());
        Self { tx }
    }

    /// Returns a copy of the current session state.
    pub fn snapshot(&self) -> DonationSession {
        self.tx.borrow().clone()
    }

    /// Subscribes to session changes. Every mutation publishes a new
    /// snapshot before the mutating call returns.
    pub fn subscribe(&self) -> watch::Receiver<DonationSession> {
        self.tx.subscribe()
    }

    /// The current reset generation. Gateway calls capture this before
    /// suspending and compare after resuming; a mismatch means the session
    /// was reset while the call was in flight and the result is stale.
    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    pub fn open_modal(&self) {
        self.tx.send_modify(|s| s.modal_open = true);
    }

    pub fn close_modal(&self) {
        self.tx.send_modify(|s| s.modal_open = false);
    }

    /// Records the selected amount. Changing the amount invalidates any
    /// payment intent created for the previous one.
    pub fn set_amount(&self, amount: f64) {
        self.tx.send_modify(|s| {
            if s.amount != amount {
                s.intent = None;
            }
            s.amount = amount;
        });
    }

    pub(crate) fn set_step(&self, step: DonationStep) {
        self.tx.send_modify(|s| s.step = step);
    }

    pub(crate) fn set_auth_mode(&self, mode: AuthMode) {
        self.tx.send_modify(|s| s.auth_mode = mode);
    }

    /// Stores the authenticated donor, or clears it. `is_authenticated`
    /// follows `user` presence.
    pub(crate) fn set_user(&self, user: Option<DonorIdentity>) {
        self.tx.send_modify(|s| {
            s.is_authenticated = user.is_some();
            s.user = user;
        });
    }

    /// Forces the authentication flag. `set_user` is the normal path and
    /// keeps the flag in sync on its own; this exists for callers that
    /// learn about a sign-out before they can resolve the user.
    pub fn set_is_authenticated(&self, is_authenticated: bool) {
        self.tx.send_modify(|s| s.is_authenticated = is_authenticated);
    }

    pub(crate) fn set_intent(&self, intent: Option<DonationIntent>) {
        self.tx.send_modify(|s| s.intent = intent);
    }

    pub(crate) fn set_pending_email(&self, email: Option<String>) {
        self.tx.send_modify(|s| s.pending_email = email);
    }

    /// Restores the session defaults, preserving identity: the donor
    /// outlives a single donation flow. Bumps the generation so in-flight
    /// gateway results for the old session are discarded on arrival.
    pub fn reset_modal(&self) {
        self.tx.send_modify(|s| {
            let user = s.user.take();
            let is_authenticated = s.is_authenticated;
            let generation = s.generation;
            *s = DonationSession {
                user,
                is_authenticated,
                generation: generation + 1,
                ..DonationSession::default()
            };
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donor() -> DonorIdentity {
        DonorIdentity {
            user_id: "u-1".to_string(),
            username: "sarah@example.com".to_string(),
        }
    }

    #[test]
    fn set_user_keeps_is_authenticated_consistent() {
        let store = SessionStore::new();
        store.set_user(Some(donor()));
        let s = store.snapshot();
        assert!(s.is_authenticated);
        assert!(s.user.is_some());

        store.set_user(None);
        let s = store.snapshot();
        assert!(!s.is_authenticated);
        assert!(s.user.is_none());
    }

    #[test]
    fn reset_preserves_identity_and_restores_defaults() {
        let store = SessionStore::new();
        store.open_modal();
        store.set_amount(25.0);
        store.set_step(DonationStep::Payment);
        store.set_user(Some(donor()));
        store.set_intent(Some(DonationIntent {
            client_secret: "sec".to_string(),
            amount_minor: 2500,
        }));

        store.reset_modal();

        let s = store.snapshot();
        assert!(!s.modal_open);
        assert_eq!(s.amount, 0.0);
        assert_eq!(s.step, DonationStep::Amount);
        assert!(s.intent.is_none());
        assert!(s.is_authenticated);
        assert_eq!(s.user, Some(donor()));
    }

    #[test]
    fn reset_is_idempotent_apart_from_the_generation() {
        let store = SessionStore::new();
        store.set_amount(10.0);
        store.reset_modal();
        let once = store.snapshot();
        store.reset_modal();
        let twice = store.snapshot();

        assert_eq!(
            DonationSession {
                generation: 0,
                ..once.clone()
            },
            DonationSession {
                generation: 0,
                ..twice.clone()
            }
        );
        assert_eq!(twice.generation, once.generation + 1);
    }

    #[test]
    fn changing_the_amount_discards_the_intent() {
        let store = SessionStore::new();
        store.set_amount(25.0);
        store.set_intent(Some(DonationIntent {
            client_secret: "sec".to_string(),
            amount_minor: 2500,
        }));

        // Same amount keeps the intent alive.
        store.set_amount(25.0);
        assert!(store.snapshot().intent.is_some());

        store.set_amount(50.0);
        assert!(store.snapshot().intent.is_none());
    }

    #[test]
    fn observers_see_mutations_synchronously() {
        let store = SessionStore::new();
        let rx = store.subscribe();
        store.set_amount(10.0);
        assert_eq!(rx.borrow().amount, 10.0);
    }
}
