//! The single user-visible message slot of a profile view.

use serde::Serialize;

/// Shown when any open-time fetch fails.
pub const RETRIEVAL_FAILED: &str = "An error occurred while retrieving member data.";
/// Shown after a member was created.
pub const MEMBER_CREATED: &str = "User Created";
/// Shown after a member was updated.
pub const MEMBER_UPDATED: &str = "User updated";

/// Message state exposed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "camelCase")]
pub enum Notice {
    #[default]
    None,
    Success(String),
    Error(String),
}

impl Notice {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Notice::None)
    }

    /// Message body, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Notice::None => None,
            Notice::Success(text) | Notice::Error(text) => Some(text),
        }
    }

    /// Banner headline for the notice, worded for a create or an update form.
    #[must_use]
    pub fn headline(&self, creating: bool) -> Option<String> {
        let action = if creating { "Create User" } else { "Update" };
        match self {
            Notice::None => None,
            Notice::Success(_) => Some(format!("{action} Succeeded!")),
            Notice::Error(_) => Some(format!("{action} Failed!")),
        }
    }

    /// Error notice for a failed create/update, quoting the directory's
    /// message when it sent one.
    #[must_use]
    pub fn submission_failed(detail: Option<&str>) -> Self {
        match detail {
            Some(detail) => Notice::Error(format!("An error occurred: {detail}")),
            None => Notice::Error("An error occurred.".to_string()),
        }
    }
}
