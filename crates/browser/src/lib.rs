//! Browser Session, Anti-Detection Profile, and Consent Interactor: the
//! layer that acquires a headless Chrome context shaped to pass as an
//! ordinary desktop browser, and drives the accept-banner interaction.

pub mod consent;
pub mod pacing;
pub mod profile;
pub mod session;

pub use consent::{ConsentInteractor, ConsentOutcome};
pub use session::BrowserSession;
