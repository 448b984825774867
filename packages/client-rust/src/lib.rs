//! Member directory client — profile sessions, submission coordination and
//! directory API adapters.

pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use api::{layered, HttpMemberApi, InMemoryMemberApi, TimeoutLayer, TracingLayer};
pub use config::ClientConfig;
pub use error::SessionError;
pub use session::{ProfileSession, ProfileView, SubmissionPhase, SubmitOutcome};
