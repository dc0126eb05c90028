//! The donation wizard: controller and per-action latches.

pub mod controller;
pub mod latch;

pub use controller::{AuthWatch, DEFAULT_CALL_TIMEOUT, DonationFlow, FlowAction};
pub use latch::{ActionLatch, LatchGuard};
