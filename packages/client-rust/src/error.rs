//! Errors surfaced by profile sessions.

use memberdir_core::ApiError;

/// Failure of a profile session operation.
///
/// None of these is fatal: the session keeps its canonical state and stays
/// usable (except after [`SessionError::Closed`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// One of the open-time fetches failed; nothing was adopted.
    #[error("failed to retrieve member data")]
    Retrieval {
        #[source]
        source: ApiError,
    },
    /// Required attributes are blank; no call was made.
    #[error("required fields missing: {}", fields.join(", "))]
    MissingRequired { fields: Vec<String> },
    /// The create/update call failed or was reported unsuccessful.
    #[error("submission rejected: {message}")]
    Rejected {
        /// Text of the error notice shown to the user.
        message: String,
        #[source]
        source: ApiError,
    },
    /// A submission is already in flight.
    #[error("a submission is already in flight")]
    InFlight,
    /// The session has not finished loading a member.
    #[error("session is not ready")]
    NotReady,
    /// The session was closed.
    #[error("session is closed")]
    Closed,
    /// The session was reopened or closed before the result arrived; the
    /// result was discarded.
    #[error("result superseded by a newer session epoch")]
    Superseded,
}
