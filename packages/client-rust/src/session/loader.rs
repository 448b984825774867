//! Open-time loading of everything a profile form needs.

use memberdir_core::{
    settle, ApiError, EnumOptions, MemberApi, MemberRoute, PermissionSet, Record, SchemaRegistry,
};

/// The settled results of the open-time fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileData {
    pub schema: SchemaRegistry,
    pub permissions: PermissionSet,
    pub enum_options: EnumOptions,
    /// The persisted member; `None` when the route addresses a new member.
    pub record: Option<Record>,
}

/// Fetches enum options, schema kinds, permissions and (for an existing
/// member) the record concurrently.
///
/// All requested calls are awaited before the outcome is decided, so a fast
/// failure never leaves a slower call running unobserved.
///
/// # Errors
///
/// Returns the first failure in request order. Results of the calls that did
/// succeed are dropped.
pub async fn load_profile(
    api: &dyn MemberApi,
    route: &MemberRoute,
) -> Result<ProfileData, ApiError> {
    let record = async {
        match route.id() {
            Some(id) => settle(api.fetch_record(id).await).map(Some),
            None => Ok(None),
        }
    };

    let (enum_options, schema, permissions, record) = tokio::join!(
        async { settle(api.fetch_enum_options().await) },
        async { settle(api.fetch_schema_kinds().await) },
        async { settle(api.fetch_permissions(route).await) },
        record,
    );

    Ok(ProfileData {
        enum_options: enum_options?,
        schema: schema?,
        permissions: permissions?,
        record: record?,
    })
}

#[cfg(test)]
mod tests {
    use memberdir_core::{ApiEndpoint, RecordId, SchemaKind, Value};

    use super::*;
    use crate::api::InMemoryMemberApi;

    #[tokio::test]
    async fn new_member_skips_record_fetch() {
        let api = InMemoryMemberApi::new()
            .with_schema(SchemaRegistry::new().with("name", SchemaKind::String));

        let data = load_profile(&api, &MemberRoute::New).await.unwrap();

        assert!(data.record.is_none());
        assert_eq!(data.schema.kind_of("name"), Some(SchemaKind::String));
        assert_eq!(api.call_count(ApiEndpoint::FetchRecord), 0);
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn existing_member_fetches_all_four() {
        let api = InMemoryMemberApi::new();
        let id = api.insert_member([("name", Value::from("Bob"))].into_iter().collect());

        let data = load_profile(&api, &MemberRoute::Existing(id.clone()))
            .await
            .unwrap();

        assert_eq!(data.record.and_then(|r| r.id()), Some(id));
        assert_eq!(api.calls().len(), 4);
    }

    #[tokio::test]
    async fn any_failure_fails_the_load_after_all_settle() {
        let api = InMemoryMemberApi::new();
        api.fail(
            ApiEndpoint::FetchEnumOptions,
            ApiError::Transport {
                reason: "down".to_string(),
            },
        );

        let err = load_profile(&api, &MemberRoute::Existing(RecordId::new("missing")))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport { .. }));
        assert_eq!(api.calls().len(), 4);
    }
}
