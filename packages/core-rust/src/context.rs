use serde::{Deserialize, Serialize};

use crate::schema::RequiredFields;

/// Default lifetime of a success notice before it clears itself.
pub const DEFAULT_SUCCESS_NOTICE_MS: u64 = 4000;

/// Authenticated user acting on a member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier for the authenticated user.
    pub id: String,
    /// Roles assigned to this user; the directory derives permissions from them.
    pub roles: Vec<String>,
}

/// Per-view context carrying identity, tracing and form rules.
/// Built once when a member view opens and handed by reference to the
/// components that need it; dropped when the view is left.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Authenticated principal, if the view was opened by a signed-in user.
    pub principal: Option<Principal>,
    /// Trace identifier attached to every log line of this view.
    pub trace_id: String,
    /// Attributes that must be filled before submission.
    pub required: RequiredFields,
    /// How long a success notice stays visible, in milliseconds.
    pub success_notice_ms: u64,
}

impl SessionContext {
    /// Context with the given principal and trace id, no required fields and
    /// the default notice lifetime.
    #[must_use]
    pub fn new(principal: Option<Principal>, trace_id: impl Into<String>) -> Self {
        Self {
            principal,
            trace_id: trace_id.into(),
            required: RequiredFields::default(),
            success_notice_ms: DEFAULT_SUCCESS_NOTICE_MS,
        }
    }

    /// Builder: sets the required attributes.
    #[must_use]
    pub fn with_required(mut self, required: RequiredFields) -> Self {
        self.required = required;
        self
    }

    /// Builder: sets the success notice lifetime.
    #[must_use]
    pub fn with_success_notice_ms(mut self, ms: u64) -> Self {
        self.success_notice_ms = ms;
        self
    }

    /// Identifier of the acting user, recorded on session spans.
    #[must_use]
    pub fn principal_id(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.id.as_str())
    }
}
