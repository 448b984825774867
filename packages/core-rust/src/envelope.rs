//! Response envelope and error types of the member directory API.
//!
//! Every directory call answers `{ "success": bool, "result": T }`. A call
//! counts as successful only when `success` is true and a result is present;
//! transport failures and reported failures travel the same error path.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Uniform response body of the directory API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the directory reports the call as successful.
    pub success: bool,
    /// Payload of a successful call.
    pub result: Option<T>,
    /// Human-readable explanation, usually sent with failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `result`.
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            message: None,
        }
    }

    /// Failed envelope with an optional explanation.
    pub fn failure(message: Option<String>) -> Self {
        Self {
            success: false,
            result: None,
            message,
        }
    }

    /// Extracts the payload of a successful envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unsuccessful`] when the envelope reports failure or
    /// carries no result.
    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.success, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(ApiError::Unsuccessful {
                message: self.message,
            }),
        }
    }
}

/// Outcome of one directory call.
pub type ApiResponse<T> = Result<Envelope<T>, ApiError>;

/// Collapses a call outcome into its payload or a single error.
///
/// # Errors
///
/// Returns the transport error, or [`ApiError::Unsuccessful`] for an envelope
/// that does not report success.
pub fn settle<T>(response: ApiResponse<T>) -> Result<T, ApiError> {
    response?.into_result()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a directory call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request could not be completed (connection refused, reset, ...).
    #[error("transport failure: {reason}")]
    Transport { reason: String },
    /// The directory answered with a non-success HTTP status.
    #[error("directory answered with status {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },
    /// The envelope reported failure or carried no result.
    #[error("directory reported failure")]
    Unsuccessful { message: Option<String> },
    /// The response body could not be decoded.
    #[error("malformed response: {reason}")]
    Decode { reason: String },
    /// The call did not finish within the configured timeout.
    #[error("call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl ApiError {
    /// The explanation nested in the directory's error payload, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } | ApiError::Unsuccessful { message } => {
                message.as_deref()
            }
            ApiError::Transport { .. } | ApiError::Decode { .. } | ApiError::Timeout { .. } => {
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// The six directory calls the profile engine makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiEndpoint {
    FetchRecord,
    FetchPermissions,
    FetchSchemaKinds,
    FetchEnumOptions,
    CreateRecord,
    UpdateRecord,
}

impl ApiEndpoint {
    /// Stable name used in logs and metrics labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ApiEndpoint::FetchRecord => "fetch_record",
            ApiEndpoint::FetchPermissions => "fetch_permissions",
            ApiEndpoint::FetchSchemaKinds => "fetch_schema_kinds",
            ApiEndpoint::FetchEnumOptions => "fetch_enum_options",
            ApiEndpoint::CreateRecord => "create_record",
            ApiEndpoint::UpdateRecord => "update_record",
        }
    }
}
