//! Donation wizard flow controller.
//!
//! `DonationFlow` owns the only legal transitions of the wizard step and
//! sequences the gateway calls each transition requires. Every external
//! call result is either success (advance) or failure (stay on the step,
//! return an error whose display text is shown inline); nothing is thrown
//! across component boundaries and nothing retries automatically.

use super::latch::{ActionLatch, LatchGuard};
use crate::error::{FundlineError, Result};
use crate::gateway::{AuthEvent, IdentityGateway, LedgerGateway, PaymentGateway, SignUpOutcome};
use crate::session::{AuthMode, DonationStep, SessionStore, minor_units};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::Display;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default time limit for a single gateway call. Exceeding it surfaces as
/// a retryable failure on the step that issued the call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// The async actions the flow exposes, each guarded by its own latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FlowAction {
    Auth,
    Intent,
    Payment,
}

/// Orchestrates the amount -> auth -> payment -> success wizard.
///
/// The controller is the sole writer of `step`, `auth_mode`, `user` and
/// `intent`; the UI reads session snapshots and calls the operations below.
pub struct DonationFlow {
    store: Arc<SessionStore>,
    identity: Arc<dyn IdentityGateway>,
    ledger: Arc<dyn LedgerGateway>,
    payment: Arc<dyn PaymentGateway>,
    /// Pokes the donation feed after a successful payment so the fresh
    /// donation shows up without waiting for the next poll.
    feed_refresh: Arc<Notify>,
    call_timeout: Duration,
    auth_latch: ActionLatch,
    intent_latch: ActionLatch,
    payment_latch: ActionLatch,
}

impl DonationFlow {
    pub fn new(
        store: Arc<SessionStore>,
        identity: Arc<dyn IdentityGateway>,
        ledger: Arc<dyn LedgerGateway>,
        payment: Arc<dyn PaymentGateway>,
        feed_refresh: Arc<Notify>,
    ) -> Self {
        Self {
            store,
            identity,
            ledger,
            payment,
            feed_refresh,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            auth_latch: ActionLatch::new(),
            intent_latch: ActionLatch::new(),
            payment_latch: ActionLatch::new(),
        }
    }

    /// Overrides the per-call timeout after construction.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Whether `action` currently has a gateway call in flight. The UI
    /// disables the triggering control while this is true.
    pub fn is_busy(&self, action: FlowAction) -> bool {
        self.latch(action).is_busy()
    }

    /// Opens the donation modal at the amount step.
    pub fn open(&self) {
        self.store.open_modal();
    }

    /// Closes the modal and restores defaults. Identity persists; every
    /// in-flight gateway result for the closed session is discarded on
    /// arrival via the generation bump.
    pub fn close(&self) {
        self.store.close_modal();
        self.store.reset_modal();
    }

    /// Confirms the selected amount and advances to auth, or straight to
    /// payment for an authenticated donor. Rejected locally for a
    /// non-positive amount; no network call is made.
    pub fn confirm_amount(&self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(FundlineError::validation(
                "a donation amount greater than zero is required",
            ));
        }
        self.store.set_amount(amount);
        if self.store.snapshot().is_authenticated {
            self.store.set_step(DonationStep::Payment);
        } else {
            self.store.set_auth_mode(AuthMode::SignIn);
            self.store.set_step(DonationStep::Auth);
        }
        self.store.open_modal();
        Ok(())
    }

    /// Switches between the sign-in / sign-up / confirm forms without
    /// leaving the auth step.
    pub fn set_auth_mode(&self, mode: AuthMode) {
        self.store.set_auth_mode(mode);
    }

    /// The guest path: proceed to payment without authenticating.
    pub fn skip_auth(&self) {
        if self.store.snapshot().step == DonationStep::Auth {
            self.store.set_step(DonationStep::Payment);
        }
    }

    /// Returns to the previous step. A payment intent does not survive
    /// leaving the payment step.
    pub fn back(&self) {
        match self.store.snapshot().step {
            DonationStep::Auth => {
                self.store.set_auth_mode(AuthMode::SignIn);
                self.store.set_step(DonationStep::Amount);
            }
            DonationStep::Payment => {
                self.store.set_intent(None);
                self.store.set_step(DonationStep::Amount);
            }
            _ => {}
        }
    }

    /// Signs in and, on success, advances to payment.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let _guard = self.begin(FlowAction::Auth)?;
        let generation = self.store.generation();

        self.with_timeout(self.identity.sign_in(email, password))
            .await
            .map_err(as_auth)?;

        self.finish_sign_in(generation).await
    }

    /// Creates an account. Depending on the provider this either completes
    /// immediately (and advances to payment) or parks the auth step in
    /// confirm mode until the emailed code is submitted.
    pub async fn sign_up(&self, email: &str, password: &str, name: Option<&str>) -> Result<()> {
        let _guard = self.begin(FlowAction::Auth)?;
        let generation = self.store.generation();

        let outcome = self
            .with_timeout(self.identity.sign_up(email, password, name))
            .await
            .map_err(as_auth)?;

        if self.stale(generation) {
            return Ok(());
        }

        match outcome {
            SignUpOutcome::ConfirmationRequired => {
                self.store.set_pending_email(Some(email.to_string()));
                self.store.set_auth_mode(AuthMode::Confirm);
                Ok(())
            }
            SignUpOutcome::Complete => self.finish_sign_in(generation).await,
        }
    }

    /// Submits the verification code, then re-attempts sign-in with the
    /// credentials the form still holds and advances on success.
    pub async fn confirm_sign_up(&self, email: &str, code: &str, password: &str) -> Result<()> {
        let _guard = self.begin(FlowAction::Auth)?;
        let generation = self.store.generation();

        self.with_timeout(self.identity.confirm_sign_up(email, code))
            .await
            .map_err(as_auth)?;

        self.with_timeout(self.identity.sign_in(email, password))
            .await
            .map_err(as_auth)?;

        self.store.set_pending_email(None);
        self.finish_sign_in(generation).await
    }

    /// Signs the donor out and clears the stored identity.
    pub async fn sign_out(&self) -> Result<()> {
        let _guard = self.begin(FlowAction::Auth)?;

        self.with_timeout(self.identity.sign_out())
            .await
            .map_err(as_auth)?;

        self.store.set_user(None);
        Ok(())
    }

    /// Creates a payment intent for the confirmed amount, attaching the
    /// session token when one is available. Called on entering the payment
    /// step; the session stays on payment whether this succeeds or not.
    pub async fn create_intent(&self) -> Result<()> {
        let _guard = self.begin(FlowAction::Intent)?;
        let session = self.store.snapshot();
        if session.amount <= 0.0 {
            return Err(FundlineError::validation(
                "a positive amount is required before payment",
            ));
        }
        let generation = session.generation;
        let amount_minor = minor_units(session.amount);

        let token = self.identity.id_token().await;
        let outcome = self
            .with_timeout(self.ledger.create_intent(amount_minor, token.as_deref()))
            .await;

        if self.stale(generation) {
            debug!("discarding payment intent for a reset session");
            return Ok(());
        }

        let intent = outcome.map_err(|err| FundlineError::intent(err.user_message()))?;
        info!(amount_minor, "payment intent created");
        self.store.set_intent(Some(intent));
        Ok(())
    }

    /// Confirms the payment against the stored intent. Success is the only
    /// way into [`DonationStep::Success`]; failure keeps the session on the
    /// payment step with the latch released so the donor can resubmit.
    pub async fn submit_payment(&self) -> Result<()> {
        let _guard = self.begin(FlowAction::Payment)?;
        let session = self.store.snapshot();
        let Some(intent) = session.intent else {
            return Err(FundlineError::payment("no payment session available"));
        };
        let generation = session.generation;

        let outcome = self
            .with_timeout(self.payment.confirm_payment(&intent.client_secret))
            .await;

        if self.stale(generation) {
            debug!("discarding payment result for a reset session");
            return Ok(());
        }

        outcome.map_err(|err| FundlineError::payment(err.user_message()))?;

        info!(amount_minor = intent.amount_minor, "donation completed");
        self.store.set_step(DonationStep::Success);
        self.feed_refresh.notify_one();
        Ok(())
    }

    /// Initial "who am I" probe at startup. Not being signed in is a normal
    /// outcome, not an error.
    pub async fn bootstrap(&self) {
        match self.with_timeout(self.identity.current_user()).await {
            Ok(user) => self.store.set_user(user),
            Err(err) => {
                debug!(error = %err, "no authenticated user at startup");
                self.store.set_user(None);
            }
        }
    }

    /// Mirrors provider-pushed auth changes into the store. The returned
    /// handle aborts the observer task when dropped, so the subscription
    /// cannot outlive the flow that opened it.
    pub fn watch_auth(&self) -> AuthWatch {
        let mut events = self.identity.subscribe();
        let store = self.store.clone();
        let identity = self.identity.clone();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn) => match identity.current_user().await {
                        Ok(user) => store.set_user(user),
                        Err(err) => warn!(error = %err, "signed-in event without a resolvable user"),
                    },
                    Ok(AuthEvent::SignedOut) | Ok(AuthEvent::TokenRefreshFailed) => {
                        store.set_user(None);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        AuthWatch { task }
    }

    /// After a successful sign-in or completed sign-up: resolve the user,
    /// store it, and advance to payment unless the session was reset while
    /// we were away. Identity updates always apply (the donor outlives a
    /// single flow); only the step transition is generation-guarded.
    async fn finish_sign_in(&self, generation: u64) -> Result<()> {
        match self.with_timeout(self.identity.current_user()).await {
            Ok(Some(user)) => self.store.set_user(Some(user)),
            Ok(None) => warn!("signed in, but the provider reports no current user"),
            Err(err) => warn!(error = %err, "could not resolve the signed-in user"),
        }

        if self.stale(generation) {
            debug!("discarding auth transition for a reset session");
            return Ok(());
        }
        self.store.set_step(DonationStep::Payment);
        Ok(())
    }

    fn latch(&self, action: FlowAction) -> &ActionLatch {
        match action {
            FlowAction::Auth => &self.auth_latch,
            FlowAction::Intent => &self.intent_latch,
            FlowAction::Payment => &self.payment_latch,
        }
    }

    fn begin(&self, action: FlowAction) -> Result<LatchGuard> {
        self.latch(action).try_begin().ok_or_else(|| {
            FundlineError::internal(format!("{action} action is already in flight"))
        })
    }

    fn stale(&self, generation: u64) -> bool {
        self.store.generation() != generation
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(FundlineError::transport("request timed out", true)),
        }
    }
}

/// Scoped auth-event subscription; dropping it unsubscribes.
pub struct AuthWatch {
    task: JoinHandle<()>,
}

impl Drop for AuthWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn as_auth(err: FundlineError) -> FundlineError {
    FundlineError::auth(err.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::LogEntry;
    use crate::session::{DonationIntent, DonorIdentity};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::sleep;

    const PASSWORD: &str = "hunter2!";
    const CODE: &str = "123456";

    struct MockIdentity {
        events: broadcast::Sender<AuthEvent>,
        requires_confirmation: bool,
        confirmed: Mutex<bool>,
        signed_in: Mutex<Option<DonorIdentity>>,
    }

    impl MockIdentity {
        fn new(requires_confirmation: bool) -> Self {
            let (events, _) = broadcast::channel(8);
            Self {
                events,
                requires_confirmation,
                confirmed: Mutex::new(false),
                signed_in: Mutex::new(None),
            }
        }

        fn donor(email: &str) -> DonorIdentity {
            DonorIdentity {
                user_id: format!("u-{email}"),
                username: email.to_string(),
            }
        }
    }

    #[async_trait]
    impl IdentityGateway for MockIdentity {
        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            _name: Option<&str>,
        ) -> crate::Result<SignUpOutcome> {
            if self.requires_confirmation && !*self.confirmed.lock().unwrap() {
                return Ok(SignUpOutcome::ConfirmationRequired);
            }
            *self.signed_in.lock().unwrap() = Some(Self::donor(email));
            Ok(SignUpOutcome::Complete)
        }

        async fn confirm_sign_up(&self, _email: &str, code: &str) -> crate::Result<()> {
            if code != CODE {
                return Err(FundlineError::auth("Invalid verification code"));
            }
            *self.confirmed.lock().unwrap() = true;
            Ok(())
        }

        async fn sign_in(&self, email: &str, password: &str) -> crate::Result<()> {
            let confirmed = !self.requires_confirmation || *self.confirmed.lock().unwrap();
            if password != PASSWORD || !confirmed {
                return Err(FundlineError::auth("Incorrect username or password"));
            }
            *self.signed_in.lock().unwrap() = Some(Self::donor(email));
            Ok(())
        }

        async fn sign_out(&self) -> crate::Result<()> {
            *self.signed_in.lock().unwrap() = None;
            Ok(())
        }

        async fn current_user(&self) -> crate::Result<Option<DonorIdentity>> {
            Ok(self.signed_in.lock().unwrap().clone())
        }

        async fn id_token(&self) -> Option<String> {
            self.signed_in
                .lock()
                .unwrap()
                .as_ref()
                .map(|_| "token-123".to_string())
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }
    }

    #[derive(Default)]
    struct MockLedger {
        intents: Mutex<Vec<(i64, Option<String>)>>,
        reject: AtomicBool,
    }

    #[async_trait]
    impl LedgerGateway for MockLedger {
        async fn total_raised(&self) -> crate::Result<f64> {
            Ok(1250.0)
        }

        async fn recent_donations(&self) -> crate::Result<Vec<LogEntry>> {
            Ok(Vec::new())
        }

        async fn create_intent(
            &self,
            amount_minor: i64,
            token: Option<&str>,
        ) -> crate::Result<DonationIntent> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(FundlineError::gateway(400, "Amount must be positive", false));
            }
            self.intents
                .lock()
                .unwrap()
                .push((amount_minor, token.map(str::to_string)));
            Ok(DonationIntent {
                client_secret: "pi_test_secret_abc".to_string(),
                amount_minor,
            })
        }
    }

    #[derive(Default)]
    struct MockPayment {
        decline: AtomicBool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl PaymentGateway for MockPayment {
        async fn confirm_payment(&self, _client_secret: &str) -> crate::Result<()> {
            if let Some(delay) = self.delay {
                sleep(delay).await;
            }
            if self.decline.load(Ordering::SeqCst) {
                return Err(FundlineError::payment("Your card was declined"));
            }
            Ok(())
        }
    }

    struct Harness {
        flow: Arc<DonationFlow>,
        store: Arc<SessionStore>,
        identity: Arc<MockIdentity>,
        ledger: Arc<MockLedger>,
        payment: Arc<MockPayment>,
        refresh: Arc<Notify>,
    }

    fn harness_with(identity: MockIdentity, payment: MockPayment) -> Harness {
        let store = Arc::new(SessionStore::new());
        let identity = Arc::new(identity);
        let ledger = Arc::new(MockLedger::default());
        let payment = Arc::new(payment);
        let refresh = Arc::new(Notify::new());
        let flow = Arc::new(DonationFlow::new(
            store.clone(),
            identity.clone(),
            ledger.clone(),
            payment.clone(),
            refresh.clone(),
        ));
        Harness {
            flow,
            store,
            identity,
            ledger,
            payment,
            refresh,
        }
    }

    fn harness() -> Harness {
        harness_with(MockIdentity::new(false), MockPayment::default())
    }

    #[tokio::test]
    async fn non_positive_amount_never_leaves_the_amount_step() {
        let h = harness();
        for amount in [0.0, -5.0, f64::NAN] {
            let err = h.flow.confirm_amount(amount).unwrap_err();
            assert!(err.is_validation());
            let session = h.store.snapshot();
            assert_eq!(session.step, DonationStep::Amount);
            assert!(!session.modal_open);
        }
    }

    #[tokio::test]
    async fn sign_in_success_authenticates_and_advances() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();
        assert_eq!(h.store.snapshot().step, DonationStep::Auth);

        h.flow.sign_in("sarah@example.com", PASSWORD).await.unwrap();

        let session = h.store.snapshot();
        assert!(session.is_authenticated);
        assert_eq!(
            session.user.as_ref().map(|u| u.username.as_str()),
            Some("sarah@example.com")
        );
        assert_eq!(session.step, DonationStep::Payment);
    }

    #[tokio::test]
    async fn failed_sign_in_stays_in_auth() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();

        let err = h.flow.sign_in("sarah@example.com", "wrong").await.unwrap_err();
        assert!(err.is_auth());
        assert!(!err.user_message().is_empty());
        assert_eq!(h.store.snapshot().step, DonationStep::Auth);
        assert!(!h.flow.is_busy(FlowAction::Auth));
    }

    #[tokio::test]
    async fn failed_payment_stays_on_payment_and_allows_resubmission() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();
        h.flow.skip_auth();
        h.flow.create_intent().await.unwrap();

        h.payment.decline.store(true, Ordering::SeqCst);
        let err = h.flow.submit_payment().await.unwrap_err();
        assert!(!err.user_message().is_empty());
        assert_eq!(h.store.snapshot().step, DonationStep::Payment);
        assert!(!h.flow.is_busy(FlowAction::Payment));

        h.payment.decline.store(false, Ordering::SeqCst);
        h.flow.submit_payment().await.unwrap();
        assert_eq!(h.store.snapshot().step, DonationStep::Success);
    }

    #[tokio::test]
    async fn close_and_reopen_starts_clean_with_identity_kept() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();
        h.flow.sign_in("sarah@example.com", PASSWORD).await.unwrap();

        h.flow.close();
        let session = h.store.snapshot();
        assert!(!session.modal_open);
        assert_eq!(session.step, DonationStep::Amount);
        assert_eq!(session.amount, 0.0);
        assert!(session.is_authenticated);

        h.flow.open();
        let session = h.store.snapshot();
        assert!(session.modal_open);
        assert_eq!(session.step, DonationStep::Amount);
        assert_eq!(
            session.user.as_ref().map(|u| u.username.as_str()),
            Some("sarah@example.com")
        );
    }

    /// The end-to-end happy path: $25, sign in, intent for 2500 minor units
    /// with the session token attached, confirm, feed invalidated.
    #[tokio::test]
    async fn signed_in_donation_runs_the_whole_wizard() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();
        assert_eq!(h.store.snapshot().step, DonationStep::Auth);

        h.flow.sign_in("sarah@example.com", PASSWORD).await.unwrap();
        assert_eq!(h.store.snapshot().step, DonationStep::Payment);

        h.flow.create_intent().await.unwrap();
        assert_eq!(
            h.ledger.intents.lock().unwrap().as_slice(),
            &[(2500, Some("token-123".to_string()))]
        );
        assert!(h.store.snapshot().intent.is_some());

        h.flow.submit_payment().await.unwrap();
        assert_eq!(h.store.snapshot().step, DonationStep::Success);

        // The feed was poked for an early refetch.
        tokio::time::timeout(Duration::from_millis(10), h.refresh.notified())
            .await
            .expect("feed refresh was not requested");
    }

    #[tokio::test]
    async fn authenticated_donor_skips_auth() {
        let h = harness();
        h.identity.sign_in("mike@example.com", PASSWORD).await.unwrap();
        h.flow.bootstrap().await;

        h.flow.confirm_amount(10.0).unwrap();
        assert_eq!(h.store.snapshot().step, DonationStep::Payment);
    }

    #[tokio::test]
    async fn guest_donation_attaches_no_token() {
        let h = harness();
        h.flow.confirm_amount(5.0).unwrap();
        h.flow.skip_auth();
        h.flow.create_intent().await.unwrap();
        assert_eq!(h.ledger.intents.lock().unwrap().as_slice(), &[(500, None)]);
    }

    #[tokio::test]
    async fn sign_up_confirmation_flow() {
        let h = harness_with(MockIdentity::new(true), MockPayment::default());
        h.flow.confirm_amount(25.0).unwrap();

        h.flow
            .sign_up("new@example.com", PASSWORD, Some("New Donor"))
            .await
            .unwrap();
        let session = h.store.snapshot();
        assert_eq!(session.step, DonationStep::Auth);
        assert_eq!(session.auth_mode, AuthMode::Confirm);
        assert_eq!(session.pending_email.as_deref(), Some("new@example.com"));

        let err = h
            .flow
            .confirm_sign_up("new@example.com", "000000", PASSWORD)
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(h.store.snapshot().auth_mode, AuthMode::Confirm);

        h.flow
            .confirm_sign_up("new@example.com", CODE, PASSWORD)
            .await
            .unwrap();
        let session = h.store.snapshot();
        assert_eq!(session.step, DonationStep::Payment);
        assert!(session.is_authenticated);
        assert!(session.pending_email.is_none());
    }

    #[tokio::test]
    async fn rejected_intent_is_an_intent_error() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();
        h.flow.skip_auth();

        h.ledger.reject.store(true, Ordering::SeqCst);
        let err = h.flow.create_intent().await.unwrap_err();
        assert!(matches!(err, FundlineError::Intent(_)));
        assert_eq!(err.user_message(), "Amount must be positive");
        assert!(h.store.snapshot().intent.is_none());
        assert_eq!(h.store.snapshot().step, DonationStep::Payment);
    }

    #[tokio::test]
    async fn concurrent_payment_submission_is_refused() {
        let h = harness_with(
            MockIdentity::new(false),
            MockPayment {
                decline: AtomicBool::new(false),
                delay: Some(Duration::from_millis(50)),
            },
        );
        h.flow.confirm_amount(25.0).unwrap();
        h.flow.skip_auth();
        h.flow.create_intent().await.unwrap();

        let flow = h.flow.clone();
        let first = tokio::spawn(async move { flow.submit_payment().await });
        sleep(Duration::from_millis(5)).await;

        assert!(h.flow.is_busy(FlowAction::Payment));
        assert!(h.flow.submit_payment().await.is_err());

        first.await.unwrap().unwrap();
        assert!(!h.flow.is_busy(FlowAction::Payment));
    }

    #[tokio::test]
    async fn late_payment_result_after_reset_is_discarded() {
        let h = harness_with(
            MockIdentity::new(false),
            MockPayment {
                decline: AtomicBool::new(false),
                delay: Some(Duration::from_millis(30)),
            },
        );
        h.flow.confirm_amount(25.0).unwrap();
        h.flow.skip_auth();
        h.flow.create_intent().await.unwrap();

        let flow = h.flow.clone();
        let submit = tokio::spawn(async move { flow.submit_payment().await });
        sleep(Duration::from_millis(5)).await;

        h.flow.close();
        submit.await.unwrap().unwrap();

        // The confirmation settled after the reset: no success transition,
        // no feed refresh.
        assert_eq!(h.store.snapshot().step, DonationStep::Amount);
        assert!(
            tokio::time::timeout(Duration::from_millis(10), h.refresh.notified())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn slow_gateway_surfaces_a_retryable_timeout() {
        let h = harness_with(
            MockIdentity::new(false),
            MockPayment {
                decline: AtomicBool::new(false),
                delay: Some(Duration::from_millis(100)),
            },
        );
        let flow = DonationFlow::new(
            h.store.clone(),
            h.identity.clone(),
            h.ledger.clone(),
            h.payment.clone(),
            h.refresh.clone(),
        )
        .with_call_timeout(Duration::from_millis(10));

        flow.confirm_amount(25.0).unwrap();
        flow.skip_auth();
        flow.create_intent().await.unwrap();

        let err = flow.submit_payment().await.unwrap_err();
        assert!(err.user_message().contains("timed out"));
        assert_eq!(h.store.snapshot().step, DonationStep::Payment);
    }

    #[tokio::test]
    async fn back_from_payment_discards_the_intent() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();
        h.flow.skip_auth();
        h.flow.create_intent().await.unwrap();
        assert!(h.store.snapshot().intent.is_some());

        h.flow.back();
        let session = h.store.snapshot();
        assert_eq!(session.step, DonationStep::Amount);
        assert!(session.intent.is_none());
    }

    #[tokio::test]
    async fn auth_events_mirror_into_the_store() {
        let h = harness();
        let _watch = h.flow.watch_auth();

        h.identity.sign_in("sarah@example.com", PASSWORD).await.unwrap();
        h.identity.events.send(AuthEvent::SignedIn).unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(h.store.snapshot().is_authenticated);

        *h.identity.signed_in.lock().unwrap() = None;
        h.identity.events.send(AuthEvent::SignedOut).unwrap();
        sleep(Duration::from_millis(10)).await;
        let session = h.store.snapshot();
        assert!(!session.is_authenticated);
        assert!(session.user.is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_the_stored_identity() {
        let h = harness();
        h.flow.confirm_amount(25.0).unwrap();
        h.flow.sign_in("sarah@example.com", PASSWORD).await.unwrap();
        assert!(h.store.snapshot().is_authenticated);

        h.flow.sign_out().await.unwrap();
        assert!(!h.store.snapshot().is_authenticated);
    }
}
