//! Member directory core — records, schema kinds, permissions, editor dispatch
//! and upstream/local edit tracking for the profile form.

pub mod context;
pub mod editor;
pub mod envelope;
pub mod notice;
pub mod permission;
pub mod route;
pub mod schema;
pub mod tracker;
pub mod traits;
pub mod types;

pub use context::{Principal, SessionContext};
pub use editor::{dispatch, render_form, AttributeChange, EditorDescriptor, EditorInput};
pub use envelope::{settle, ApiEndpoint, ApiError, ApiResponse, Envelope};
pub use notice::Notice;
pub use permission::PermissionSet;
pub use route::MemberRoute;
pub use schema::{EnumOptions, RequiredFields, SchemaKind, SchemaRegistry, ValidationResult};
pub use tracker::RecordStateTracker;
pub use traits::MemberApi;
pub use types::{Record, RecordId, Value};
