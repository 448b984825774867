//! In-memory [`MemberApi`] implementation.
//!
//! [`InMemoryMemberApi`] keeps members in a `DashMap`, assigns UUID identities
//! on create, and records every call. Individual endpoints can be made to fail
//! so error paths can be exercised without a directory server. Useful for
//! tests, demos and offline development.

use async_trait::async_trait;
use dashmap::DashMap;
use memberdir_core::types::ID_ATTRIBUTE;
use memberdir_core::{
    ApiEndpoint, ApiError, ApiResponse, EnumOptions, Envelope, MemberApi, MemberRoute,
    PermissionSet, Record, RecordId, SchemaRegistry, Value,
};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

/// One recorded call against the in-memory directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub endpoint: ApiEndpoint,
    /// Member addressed by the call, if any (`new` for permissions of a new member).
    pub target: Option<String>,
    /// Payload of create/update calls.
    pub payload: Option<Record>,
}

/// Directory API backed by process memory.
pub struct InMemoryMemberApi {
    members: DashMap<RecordId, Record>,
    schema: RwLock<SchemaRegistry>,
    enum_options: RwLock<EnumOptions>,
    default_permissions: RwLock<PermissionSet>,
    member_permissions: DashMap<MemberRoute, PermissionSet>,
    failures: DashMap<ApiEndpoint, ApiError>,
    calls: Mutex<Vec<ApiCall>>,
}

impl InMemoryMemberApi {
    /// Creates an empty directory: no members, no schema, no permissions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
            schema: RwLock::new(SchemaRegistry::new()),
            enum_options: RwLock::new(EnumOptions::new()),
            default_permissions: RwLock::new(PermissionSet::default()),
            member_permissions: DashMap::new(),
            failures: DashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_schema(self, schema: SchemaRegistry) -> Self {
        *self.schema.write() = schema;
        self
    }

    #[must_use]
    pub fn with_enum_options(self, options: EnumOptions) -> Self {
        *self.enum_options.write() = options;
        self
    }

    /// Permissions returned for every member without a specific override.
    #[must_use]
    pub fn with_permissions(self, permissions: PermissionSet) -> Self {
        *self.default_permissions.write() = permissions;
        self
    }

    /// Permissions returned for one member (or for [`MemberRoute::New`]).
    #[must_use]
    pub fn with_member_permissions(self, route: MemberRoute, permissions: PermissionSet) -> Self {
        self.member_permissions.insert(route, permissions);
        self
    }

    /// Seeds a member. Records without an identity get a fresh one.
    #[must_use]
    pub fn with_member(self, record: Record) -> Self {
        self.insert_member(record);
        self
    }

    /// Stores a member, returning its identity.
    pub fn insert_member(&self, mut record: Record) -> RecordId {
        let id = record.id().unwrap_or_else(|| {
            let id = RecordId::new(Uuid::new_v4().simple().to_string());
            record.insert(ID_ATTRIBUTE, Value::String(id.to_string()));
            id
        });
        self.members.insert(id.clone(), record);
        id
    }

    /// Makes every subsequent call to `endpoint` fail with `error`.
    pub fn fail(&self, endpoint: ApiEndpoint, error: ApiError) {
        self.failures.insert(endpoint, error);
    }

    /// Lets `endpoint` succeed again.
    pub fn recover(&self, endpoint: ApiEndpoint) {
        self.failures.remove(&endpoint);
    }

    /// Current stored state of a member.
    #[must_use]
    pub fn member(&self, id: &RecordId) -> Option<Record> {
        self.members.get(id).map(|entry| entry.value().clone())
    }

    /// Number of stored members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made to `endpoint`.
    #[must_use]
    pub fn call_count(&self, endpoint: ApiEndpoint) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    fn record_call(&self, endpoint: ApiEndpoint, target: Option<String>, payload: Option<Record>) {
        self.calls.lock().push(ApiCall {
            endpoint,
            target,
            payload,
        });
    }

    fn injected_failure(&self, endpoint: ApiEndpoint) -> Option<ApiError> {
        self.failures.get(&endpoint).map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryMemberApi {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &RecordId) -> ApiError {
    ApiError::Status {
        status: 404,
        message: Some(format!("member {id} not found")),
    }
}

#[async_trait]
impl MemberApi for InMemoryMemberApi {
    async fn fetch_record(&self, id: &RecordId) -> ApiResponse<Record> {
        self.record_call(ApiEndpoint::FetchRecord, Some(id.to_string()), None);
        if let Some(error) = self.injected_failure(ApiEndpoint::FetchRecord) {
            return Err(error);
        }
        self.member(id).map(Envelope::ok).ok_or_else(|| not_found(id))
    }

    async fn fetch_permissions(&self, route: &MemberRoute) -> ApiResponse<PermissionSet> {
        self.record_call(
            ApiEndpoint::FetchPermissions,
            Some(route.segment().to_string()),
            None,
        );
        if let Some(error) = self.injected_failure(ApiEndpoint::FetchPermissions) {
            return Err(error);
        }
        let permissions = self
            .member_permissions
            .get(route)
            .map_or_else(|| self.default_permissions.read().clone(), |p| p.value().clone());
        Ok(Envelope::ok(permissions))
    }

    async fn fetch_schema_kinds(&self) -> ApiResponse<SchemaRegistry> {
        self.record_call(ApiEndpoint::FetchSchemaKinds, None, None);
        if let Some(error) = self.injected_failure(ApiEndpoint::FetchSchemaKinds) {
            return Err(error);
        }
        Ok(Envelope::ok(self.schema.read().clone()))
    }

    async fn fetch_enum_options(&self) -> ApiResponse<EnumOptions> {
        self.record_call(ApiEndpoint::FetchEnumOptions, None, None);
        if let Some(error) = self.injected_failure(ApiEndpoint::FetchEnumOptions) {
            return Err(error);
        }
        Ok(Envelope::ok(self.enum_options.read().clone()))
    }

    async fn create_record(&self, fields: &Record) -> ApiResponse<Record> {
        self.record_call(ApiEndpoint::CreateRecord, None, Some(fields.clone()));
        if let Some(error) = self.injected_failure(ApiEndpoint::CreateRecord) {
            return Err(error);
        }
        let mut record: Record = fields
            .iter()
            .filter(|(attribute, _)| attribute.as_str() != ID_ATTRIBUTE)
            .map(|(attribute, value)| (attribute.clone(), value.clone()))
            .collect();
        let id = RecordId::new(Uuid::new_v4().simple().to_string());
        record.insert(ID_ATTRIBUTE, Value::String(id.to_string()));
        self.members.insert(id, record.clone());
        Ok(Envelope::ok(record))
    }

    async fn update_record(&self, fields: &Record, id: &RecordId) -> ApiResponse<Record> {
        self.record_call(
            ApiEndpoint::UpdateRecord,
            Some(id.to_string()),
            Some(fields.clone()),
        );
        if let Some(error) = self.injected_failure(ApiEndpoint::UpdateRecord) {
            return Err(error);
        }
        let Some(mut entry) = self.members.get_mut(id) else {
            return Err(not_found(id));
        };
        for (attribute, value) in fields.iter() {
            if attribute != ID_ATTRIBUTE {
                entry.insert(attribute.clone(), value.clone());
            }
        }
        Ok(Envelope::ok(entry.value().clone()))
    }
}
