//! Donation session state: the model, the step enums, and the store that
//! owns them.

pub mod model;
pub mod step;
pub mod store;

pub use model::{DonationIntent, DonationSession, DonorIdentity, minor_units};
pub use step::{AuthMode, DonationStep};
pub use store::SessionStore;
