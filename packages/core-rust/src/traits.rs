use async_trait::async_trait;

use crate::envelope::ApiResponse;
use crate::permission::PermissionSet;
use crate::route::MemberRoute;
use crate::schema::{EnumOptions, SchemaRegistry};
use crate::types::{Record, RecordId};

/// Persistence collaborator of the profile engine: the member directory API.
/// Implementations: HTTP (reqwest), in-memory (tests and demos).
#[async_trait]
pub trait MemberApi: Send + Sync {
    /// Load a single member by identity.
    async fn fetch_record(&self, id: &RecordId) -> ApiResponse<Record>;

    /// Load the acting user's permissions on a member. For [`MemberRoute::New`]
    /// this is the scope of a member being created.
    async fn fetch_permissions(&self, route: &MemberRoute) -> ApiResponse<PermissionSet>;

    /// Load the declared kind of every member attribute.
    async fn fetch_schema_kinds(&self) -> ApiResponse<SchemaRegistry>;

    /// Load the allowed values of every Enum attribute.
    async fn fetch_enum_options(&self) -> ApiResponse<EnumOptions>;

    /// Create a member. The returned record carries the assigned identity.
    async fn create_record(&self, fields: &Record) -> ApiResponse<Record>;

    /// Update a member and return its canonical state.
    async fn update_record(&self, fields: &Record, id: &RecordId) -> ApiResponse<Record>;
}
