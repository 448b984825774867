//! Member view locations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// Path segment that addresses a member which does not exist yet.
pub const NEW_MEMBER_SEGMENT: &str = "new";

/// Which member a profile view edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberRoute {
    /// A member being created; it has no identity until the first successful submit.
    New,
    /// A persisted member.
    Existing(RecordId),
}

impl MemberRoute {
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, MemberRoute::New)
    }

    /// Identity of the member, absent for [`MemberRoute::New`].
    #[must_use]
    pub fn id(&self) -> Option<&RecordId> {
        match self {
            MemberRoute::New => None,
            MemberRoute::Existing(id) => Some(id),
        }
    }

    /// Path segment used in URLs: the id, or `new`.
    #[must_use]
    pub fn segment(&self) -> &str {
        match self {
            MemberRoute::New => NEW_MEMBER_SEGMENT,
            MemberRoute::Existing(id) => id.as_str(),
        }
    }

    /// Location of the member's profile view, e.g. `/member/abc123`.
    #[must_use]
    pub fn location(&self) -> String {
        format!("/member/{}", self.segment())
    }
}

impl fmt::Display for MemberRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Error for an empty member path segment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("member segment must not be empty")]
pub struct EmptySegment;

impl FromStr for MemberRoute {
    type Err = EmptySegment;

    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        match segment.trim() {
            "" => Err(EmptySegment),
            NEW_MEMBER_SEGMENT => Ok(MemberRoute::New),
            id => Ok(MemberRoute::Existing(RecordId::new(id))),
        }
    }
}
