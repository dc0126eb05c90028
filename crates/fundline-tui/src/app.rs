//! TUI application state.
//!
//! `App` holds everything the renderer needs: the latest session and feed
//! snapshots, the form inputs, and the inline error slots. Wizard
//! operations are dispatched onto the runtime and their results come back
//! through a message channel drained on each tick, so the draw loop never
//! awaits a gateway.

use crate::boot::BootSequence;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use fundline_core::error::FundlineError;
use fundline_core::feed::FeedSnapshot;
use fundline_core::flow::{DonationFlow, FlowAction};
use fundline_core::session::{AuthMode, DonationSession, DonationStep};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Preset donation amounts, in dollars.
pub const PRESET_AMOUNTS: [u64; 3] = [10, 25, 50];

/// Result of a dispatched wizard operation, routed back to the UI thread.
pub enum UiMsg {
    FlowSettled {
        origin: FlowOrigin,
        result: Result<(), FundlineError>,
    },
}

/// Which inline error slot a settled operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOrigin {
    Auth,
    Payment,
}

/// A single-line text input with cursor handling.
pub struct TextInput {
    value: String,
    cursor: usize,
    masked: bool,
    digits_only: bool,
}

impl TextInput {
    pub fn new(masked: bool) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            masked,
            digits_only: false,
        }
    }

    pub fn digits() -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            masked: false,
            digits_only: true,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// What the renderer prints: masked fields show one `*` per character.
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    /// Applies an edit key. Returns whether the key was consumed.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                if self.digits_only && !c.is_ascii_digit() {
                    return true;
                }
                self.value.insert(self.cursor, c);
                self.cursor = (self.cursor + 1).min(self.value.len());
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 && !self.value.is_empty() {
                    let idx = self.cursor - 1;
                    self.value.remove(idx);
                    self.cursor = idx;
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.value.len() {
                    self.value.remove(self.cursor);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.value.len());
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.value.len();
                true
            }
            _ => false,
        }
    }
}

/// Focus on the main (non-modal) screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainFocus {
    Preset(usize),
    Custom,
    Execute,
}

impl MainFocus {
    fn next(self) -> Self {
        match self {
            MainFocus::Preset(i) if i + 1 < PRESET_AMOUNTS.len() => MainFocus::Preset(i + 1),
            MainFocus::Preset(_) => MainFocus::Custom,
            MainFocus::Custom => MainFocus::Execute,
            MainFocus::Execute => MainFocus::Preset(0),
        }
    }

    fn prev(self) -> Self {
        match self {
            MainFocus::Preset(0) => MainFocus::Execute,
            MainFocus::Preset(i) => MainFocus::Preset(i - 1),
            MainFocus::Custom => MainFocus::Preset(PRESET_AMOUNTS.len() - 1),
            MainFocus::Execute => MainFocus::Custom,
        }
    }
}

/// Everything focusable inside the wizard modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalWidget {
    EmailField,
    PasswordField,
    NameField,
    CodeField,
    SignInBtn,
    SignUpBtn,
    ToSignUpBtn,
    ToSignInBtn,
    SkipBtn,
    VerifyBtn,
    ExecutePaymentBtn,
    BackBtn,
    CloseBtn,
}

impl ModalWidget {
    pub fn is_field(self) -> bool {
        matches!(
            self,
            ModalWidget::EmailField
                | ModalWidget::PasswordField
                | ModalWidget::NameField
                | ModalWidget::CodeField
        )
    }
}

/// The Tab-order of the current modal form.
pub fn modal_ring(step: DonationStep, mode: AuthMode) -> &'static [ModalWidget] {
    use ModalWidget::*;
    match step {
        DonationStep::Auth => match mode {
            AuthMode::SignIn => &[EmailField, PasswordField, SignInBtn, ToSignUpBtn, SkipBtn],
            AuthMode::SignUp => &[NameField, EmailField, PasswordField, SignUpBtn, ToSignInBtn],
            AuthMode::Confirm => &[CodeField, VerifyBtn, ToSignInBtn],
        },
        DonationStep::Payment => &[ExecutePaymentBtn, BackBtn],
        DonationStep::Success => &[CloseBtn],
        DonationStep::Amount => &[],
    }
}

/// Parses the effective donation amount from the picker state: a non-empty
/// custom value wins over the selected preset.
pub fn picked_amount(custom: &str, preset: Option<usize>) -> Option<f64> {
    if !custom.is_empty() {
        return custom.parse::<u64>().ok().map(|v| v as f64);
    }
    preset.map(|i| PRESET_AMOUNTS[i] as f64)
}

/// Main application state for the TUI.
pub struct App {
    flow: Arc<DonationFlow>,
    session_rx: watch::Receiver<DonationSession>,
    feed_rx: watch::Receiver<FeedSnapshot>,
    msg_tx: mpsc::UnboundedSender<UiMsg>,
    msg_rx: mpsc::UnboundedReceiver<UiMsg>,

    pub boot: BootSequence,
    pub funding_goal: Option<f64>,

    // Amount picker.
    pub focus: MainFocus,
    pub selected_preset: Option<usize>,
    pub custom_amount: TextInput,
    pub amount_error: Option<String>,

    // Modal form state.
    pub modal_focus: usize,
    pub email: TextInput,
    pub password: TextInput,
    pub name: TextInput,
    pub code: TextInput,
    pub auth_error: Option<String>,
    pub payment_error: Option<String>,

    /// Set once an intent fetch has been kicked off for the current visit
    /// to the payment step, so the tick loop does not hammer the backend.
    intent_requested: bool,
    last_step: DonationStep,
    last_auth_mode: AuthMode,

    pub should_quit: bool,
}

impl App {
    pub fn new(
        flow: Arc<DonationFlow>,
        feed_rx: watch::Receiver<FeedSnapshot>,
        funding_goal: Option<f64>,
    ) -> Self {
        let session_rx = flow.store().subscribe();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        Self {
            flow,
            session_rx,
            feed_rx,
            msg_tx,
            msg_rx,
            boot: BootSequence::start(),
            funding_goal,
            focus: MainFocus::Preset(1),
            selected_preset: Some(1),
            custom_amount: TextInput::digits(),
            amount_error: None,
            modal_focus: 0,
            email: TextInput::new(false),
            password: TextInput::new(true),
            name: TextInput::new(false),
            code: TextInput::digits(),
            auth_error: None,
            payment_error: None,
            intent_requested: false,
            last_step: DonationStep::Amount,
            last_auth_mode: AuthMode::SignIn,
            should_quit: false,
        }
    }

    pub fn session(&self) -> DonationSession {
        self.session_rx.borrow().clone()
    }

    pub fn feed(&self) -> FeedSnapshot {
        self.feed_rx.borrow().clone()
    }

    pub fn is_busy(&self, action: FlowAction) -> bool {
        self.flow.is_busy(action)
    }

    /// Per-tick housekeeping: drain settled operations, follow step
    /// changes, and kick off the intent fetch when the payment step needs
    /// one.
    pub fn tick(&mut self) {
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.apply(msg);
        }

        let session = self.session();
        if session.step != self.last_step || session.auth_mode != self.last_auth_mode {
            self.modal_focus = 0;
            self.last_step = session.step;
            self.last_auth_mode = session.auth_mode;
        }
        if session.step != DonationStep::Payment {
            self.intent_requested = false;
        }

        if session.modal_open
            && session.step == DonationStep::Payment
            && session.intent.is_none()
            && !self.intent_requested
            && !self.flow.is_busy(FlowAction::Intent)
        {
            self.dispatch_create_intent();
        }
    }

    fn apply(&mut self, msg: UiMsg) {
        match msg {
            UiMsg::FlowSettled { origin, result } => {
                if let Err(err) = result {
                    let message = err.user_message();
                    match origin {
                        FlowOrigin::Auth => self.auth_error = Some(message),
                        FlowOrigin::Payment => self.payment_error = Some(message),
                    }
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let session = self.session();
        if session.modal_open {
            self.handle_modal_key(key.code, &session);
        } else {
            self.handle_main_key(key.code);
        }
    }

    fn handle_main_key(&mut self, code: KeyCode) {
        match code {
            // 'q' quits, except while the custom amount field is being
            // edited.
            KeyCode::Char('q') if self.focus != MainFocus::Custom => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.prev(),
            KeyCode::Right if self.focus != MainFocus::Custom => self.focus = self.focus.next(),
            KeyCode::Left if self.focus != MainFocus::Custom => self.focus = self.focus.prev(),
            KeyCode::Enter => match self.focus {
                MainFocus::Preset(i) => {
                    self.selected_preset = Some(i);
                    self.custom_amount.clear();
                }
                MainFocus::Custom => self.focus = MainFocus::Execute,
                MainFocus::Execute => self.execute_transfer(),
            },
            code => {
                if self.focus == MainFocus::Custom
                    && self.custom_amount.handle_key(code)
                    && !self.custom_amount.is_empty()
                {
                    self.selected_preset = None;
                }
            }
        }
    }

    /// The EXECUTE_TRANSFER action: validate the picked amount and open the
    /// wizard modal.
    fn execute_transfer(&mut self) {
        self.amount_error = None;
        let amount = picked_amount(self.custom_amount.value(), self.selected_preset);
        let Some(amount) = amount else {
            self.amount_error = Some("select or enter an amount first".to_string());
            return;
        };
        match self.flow.confirm_amount(amount) {
            Ok(()) => self.reset_modal_inputs(),
            Err(err) => self.amount_error = Some(err.user_message()),
        }
    }

    fn handle_modal_key(&mut self, code: KeyCode, session: &DonationSession) {
        let ring = modal_ring(session.step, session.auth_mode);
        if code == KeyCode::Esc {
            self.flow.close();
            self.reset_modal_inputs();
            return;
        }
        if ring.is_empty() {
            return;
        }
        let focused = ring[self.modal_focus.min(ring.len() - 1)];

        match code {
            KeyCode::Tab | KeyCode::Down => self.modal_focus = (self.modal_focus + 1) % ring.len(),
            KeyCode::BackTab | KeyCode::Up => {
                self.modal_focus = (self.modal_focus + ring.len() - 1) % ring.len();
            }
            KeyCode::Enter => {
                if focused.is_field() {
                    self.modal_focus = (self.modal_focus + 1) % ring.len();
                } else {
                    self.activate(focused, session);
                }
            }
            code => {
                if let Some(input) = self.field_input(focused) {
                    input.handle_key(code);
                }
            }
        }
    }

    fn field_input(&mut self, widget: ModalWidget) -> Option<&mut TextInput> {
        match widget {
            ModalWidget::EmailField => Some(&mut self.email),
            ModalWidget::PasswordField => Some(&mut self.password),
            ModalWidget::NameField => Some(&mut self.name),
            ModalWidget::CodeField => Some(&mut self.code),
            _ => None,
        }
    }

    fn activate(&mut self, widget: ModalWidget, session: &DonationSession) {
        match widget {
            ModalWidget::SignInBtn => {
                if !self.flow.is_busy(FlowAction::Auth) {
                    self.dispatch_sign_in();
                }
            }
            ModalWidget::SignUpBtn => {
                if !self.flow.is_busy(FlowAction::Auth) {
                    self.dispatch_sign_up();
                }
            }
            ModalWidget::VerifyBtn => {
                if !self.flow.is_busy(FlowAction::Auth) {
                    self.dispatch_confirm(session);
                }
            }
            ModalWidget::ToSignUpBtn => {
                self.auth_error = None;
                self.flow.set_auth_mode(AuthMode::SignUp);
            }
            ModalWidget::ToSignInBtn => {
                self.auth_error = None;
                self.flow.set_auth_mode(AuthMode::SignIn);
            }
            ModalWidget::SkipBtn => self.flow.skip_auth(),
            ModalWidget::ExecutePaymentBtn => {
                if session.intent.is_none() {
                    if !self.flow.is_busy(FlowAction::Intent) {
                        self.dispatch_create_intent();
                    }
                } else if !self.flow.is_busy(FlowAction::Payment) {
                    self.dispatch_submit_payment();
                }
            }
            ModalWidget::BackBtn => {
                self.payment_error = None;
                self.flow.back();
            }
            ModalWidget::CloseBtn => {
                self.flow.close();
                self.reset_modal_inputs();
            }
            _ => {}
        }
    }

    fn reset_modal_inputs(&mut self) {
        self.password.clear();
        self.code.clear();
        self.auth_error = None;
        self.payment_error = None;
        self.modal_focus = 0;
        self.intent_requested = false;
    }

    fn dispatch_sign_in(&mut self) {
        self.auth_error = None;
        let flow = self.flow.clone();
        let tx = self.msg_tx.clone();
        let email = self.email.value().to_string();
        let password = self.password.value().to_string();
        tokio::spawn(async move {
            let result = flow.sign_in(&email, &password).await;
            let _ = tx.send(UiMsg::FlowSettled {
                origin: FlowOrigin::Auth,
                result,
            });
        });
    }

    fn dispatch_sign_up(&mut self) {
        self.auth_error = None;
        let flow = self.flow.clone();
        let tx = self.msg_tx.clone();
        let email = self.email.value().to_string();
        let password = self.password.value().to_string();
        let name = Some(self.name.value().to_string()).filter(|n| !n.is_empty());
        tokio::spawn(async move {
            let result = flow.sign_up(&email, &password, name.as_deref()).await;
            let _ = tx.send(UiMsg::FlowSettled {
                origin: FlowOrigin::Auth,
                result,
            });
        });
    }

    fn dispatch_confirm(&mut self, session: &DonationSession) {
        self.auth_error = None;
        let flow = self.flow.clone();
        let tx = self.msg_tx.clone();
        let email = session
            .pending_email
            .clone()
            .unwrap_or_else(|| self.email.value().to_string());
        let code = self.code.value().to_string();
        let password = self.password.value().to_string();
        tokio::spawn(async move {
            let result = flow.confirm_sign_up(&email, &code, &password).await;
            let _ = tx.send(UiMsg::FlowSettled {
                origin: FlowOrigin::Auth,
                result,
            });
        });
    }

    fn dispatch_create_intent(&mut self) {
        self.payment_error = None;
        self.intent_requested = true;
        let flow = self.flow.clone();
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = flow.create_intent().await;
            let _ = tx.send(UiMsg::FlowSettled {
                origin: FlowOrigin::Payment,
                result,
            });
        });
    }

    fn dispatch_submit_payment(&mut self) {
        self.payment_error = None;
        let flow = self.flow.clone();
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = flow.submit_payment().await;
            let _ = tx.send(UiMsg::FlowSettled {
                origin: FlowOrigin::Payment,
                result,
            });
        });
    }
}
