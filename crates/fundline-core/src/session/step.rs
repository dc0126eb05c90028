//! Wizard step types for donation session state.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// The current step of the donation wizard.
///
/// The flow is strictly linear with one optional branch (auth vs. guest):
/// `Amount -> Auth -> Payment -> Success`, where `Auth` is skipped for an
/// already-authenticated donor. Only [`DonationFlow`](crate::flow::DonationFlow)
/// transitions this value; no other component sets it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DonationStep {
    /// Picking a donation amount.
    #[default]
    Amount,
    /// Signing in, signing up, or confirming a fresh account.
    Auth,
    /// Collecting and confirming the payment.
    Payment,
    /// Terminal state until the modal is reset.
    Success,
}

/// Sub-mode of the [`DonationStep::Auth`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
    /// A verification code has been sent and is awaited.
    Confirm,
}
