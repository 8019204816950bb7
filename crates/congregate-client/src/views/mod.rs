//! Flows that sequence the session, pipeline, datasets and normalizer for
//! one screen each.

pub mod events;
pub mod registration;

pub use events::{EventCard, EventsView, LoadOutcome};
pub use registration::{RegistrationForm, RegistrationView, SubmitOutcome};
