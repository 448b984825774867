use memberdir_core::context::DEFAULT_SUCCESS_NOTICE_MS;
use memberdir_core::{Principal, RequiredFields, SessionContext};

/// Client-level configuration for profile sessions and the directory API.
///
/// Controls where the directory lives, how long calls may take, and the form
/// rules every profile view shares.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the directory API, e.g. `http://localhost:9000/api`.
    pub base_url: String,
    /// Per-call timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Lifetime of a success notice in milliseconds.
    pub success_notice_ms: u64,
    /// Attributes that must be filled before a member can be submitted.
    pub required_fields: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api".to_string(),
            request_timeout_ms: 10_000,
            success_notice_ms: DEFAULT_SUCCESS_NOTICE_MS,
            required_fields: vec!["firstName".to_string(), "lastName".to_string()],
        }
    }
}

impl ClientConfig {
    /// Builds the context of one profile view from this configuration.
    #[must_use]
    pub fn session_context(
        &self,
        principal: Option<Principal>,
        trace_id: impl Into<String>,
    ) -> SessionContext {
        SessionContext::new(principal, trace_id)
            .with_required(self.required_fields.iter().cloned().collect::<RequiredFields>())
            .with_success_notice_ms(self.success_notice_ms)
    }
}
