//! End-to-end profile scenarios against the in-memory directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use memberdir_client::{
    InMemoryMemberApi, ProfileSession, SessionError, SubmissionPhase, SubmitOutcome,
};
use memberdir_core::{
    ApiEndpoint, ApiError, ApiResponse, EditorDescriptor, EnumOptions, MemberApi, MemberRoute,
    Notice, PermissionSet, Record, RecordId, RequiredFields, SchemaKind, SchemaRegistry,
    SessionContext, Value,
};
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn record(fields: &[(&str, Value)]) -> Record {
    fields.iter().cloned().collect()
}

fn name_age_directory() -> InMemoryMemberApi {
    InMemoryMemberApi::new()
        .with_schema(
            SchemaRegistry::new()
                .with("name", SchemaKind::String)
                .with("age", SchemaKind::Number),
        )
        .with_permissions(PermissionSet::new(["name", "age"], ["name", "age"]))
}

fn session_over(api: Arc<dyn MemberApi>, required: &[&str]) -> ProfileSession {
    let ctx = SessionContext::new(None, "scenario")
        .with_required(required.iter().copied().collect::<RequiredFields>());
    ProfileSession::new(ctx, api)
}

/// Directory whose writes wait until released, to observe in-flight state.
struct GatedApi {
    inner: InMemoryMemberApi,
    gate: Notify,
}

impl GatedApi {
    fn new(inner: InMemoryMemberApi) -> Self {
        Self {
            inner,
            gate: Notify::new(),
        }
    }
}

#[async_trait]
impl MemberApi for GatedApi {
    async fn fetch_record(&self, id: &RecordId) -> ApiResponse<Record> {
        self.inner.fetch_record(id).await
    }
    async fn fetch_permissions(&self, route: &MemberRoute) -> ApiResponse<PermissionSet> {
        self.inner.fetch_permissions(route).await
    }
    async fn fetch_schema_kinds(&self) -> ApiResponse<SchemaRegistry> {
        self.inner.fetch_schema_kinds().await
    }
    async fn fetch_enum_options(&self) -> ApiResponse<EnumOptions> {
        self.inner.fetch_enum_options().await
    }
    async fn create_record(&self, fields: &Record) -> ApiResponse<Record> {
        self.gate.notified().await;
        self.inner.create_record(fields).await
    }
    async fn update_record(&self, fields: &Record, id: &RecordId) -> ApiResponse<Record> {
        self.gate.notified().await;
        self.inner.update_record(fields, id).await
    }
}

async fn wait_for_phase(session: &ProfileSession, phase: SubmissionPhase) {
    while session.phase() != phase {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_a_create_new_member_and_navigate() {
    let api = Arc::new(name_age_directory());
    let session = session_over(api.clone(), &["name"]);

    session.open(MemberRoute::New).await.unwrap();
    assert!(!session.has_pending_changes());
    assert_eq!(session.view().submit_label, "Create User");

    session.set_local_value("name", Value::from("Ada"));
    let outcome = session.submit().await.unwrap();

    let calls = api.calls();
    let creates: Vec<_> = calls
        .iter()
        .filter(|c| c.endpoint == ApiEndpoint::CreateRecord)
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].payload, Some(record(&[("name", Value::from("Ada"))])));

    let SubmitOutcome::Created { id, location } = outcome else {
        panic!("expected a create");
    };
    assert_eq!(location, format!("/member/{id}"));
    assert_eq!(session.take_navigation(), Some(location));
    assert_eq!(session.take_navigation(), None);
    assert_eq!(session.route(), Some(MemberRoute::Existing(id.clone())));
    assert_eq!(session.upstream().id(), Some(id.clone()));
    assert!(!session.has_pending_changes());

    let view = session.view();
    assert_eq!(view.notice, Notice::Success("User Created".to_string()));
    assert_eq!(view.notice_headline.as_deref(), Some("Create User Succeeded!"));

    // Following the navigation keeps the success notice.
    session.open(MemberRoute::Existing(id)).await.unwrap();
    assert_eq!(session.notice(), Notice::Success("User Created".to_string()));
    assert_eq!(session.view().submit_label, "Update");
}

#[tokio::test]
async fn scenario_b_update_existing_member() {
    let api = Arc::new(name_age_directory());
    let id = api.insert_member(record(&[("name", Value::from("Bob"))]));
    let session = session_over(api.clone(), &["name"]);

    session.open(MemberRoute::Existing(id.clone())).await.unwrap();
    session.set_local_value("name", Value::from("Bobby"));
    assert!(session.has_pending_changes());

    assert_eq!(session.submit().await.unwrap(), SubmitOutcome::Updated);

    let update = api
        .calls()
        .into_iter()
        .find(|c| c.endpoint == ApiEndpoint::UpdateRecord)
        .unwrap();
    assert_eq!(update.target.as_deref(), Some(id.as_str()));
    assert_eq!(update.payload, Some(record(&[("name", Value::from("Bobby"))])));

    assert_eq!(session.notice(), Notice::Success("User updated".to_string()));
    assert_eq!(session.upstream().get("name"), Some(&Value::from("Bobby")));
    assert!(!session.has_pending_changes());
    assert_eq!(session.take_navigation(), None);
}

#[tokio::test]
async fn scenario_c_blank_required_field_blocks_submission() {
    let api = Arc::new(name_age_directory());
    let id = api.insert_member(record(&[("name", Value::from("Bob"))]));
    let session = session_over(api.clone(), &["name"]);
    session.open(MemberRoute::Existing(id)).await.unwrap();
    let before = session.upstream();

    session.set_local_value("name", Value::from(""));
    let err = session.submit().await.unwrap_err();

    assert_eq!(
        err,
        SessionError::MissingRequired {
            fields: vec!["name".to_string()]
        }
    );
    assert_eq!(api.call_count(ApiEndpoint::UpdateRecord), 0);
    assert_eq!(api.call_count(ApiEndpoint::CreateRecord), 0);
    assert_eq!(session.upstream(), before);
    assert!(session.notice().is_none());
    assert_eq!(session.view().missing_fields, ["name"]);
    assert_eq!(session.phase(), SubmissionPhase::Idle);
}

#[tokio::test]
async fn scenario_d_permission_fetch_failure() {
    let api = Arc::new(name_age_directory());
    api.fail(
        ApiEndpoint::FetchPermissions,
        ApiError::Status {
            status: 503,
            message: None,
        },
    );
    let session = session_over(api.clone(), &["name"]);

    let err = session.open(MemberRoute::New).await.unwrap_err();

    assert!(matches!(err, SessionError::Retrieval { .. }));
    let view = session.view();
    assert!(!view.ready);
    assert!(view.editors.is_empty());
    assert_eq!(
        view.notice,
        Notice::Error("An error occurred while retrieving member data.".to_string())
    );
    assert_eq!(
        session.submit().await.unwrap_err(),
        SessionError::NotReady
    );
}

#[tokio::test]
async fn scenario_e_enum_without_options() {
    let api = Arc::new(
        InMemoryMemberApi::new()
            .with_schema(SchemaRegistry::new().with("status", SchemaKind::Enum))
            .with_permissions(PermissionSet::new(["status"], ["status"])),
    );
    let session = session_over(api, &[]);
    session.open(MemberRoute::New).await.unwrap();

    let view = session.view();
    assert_eq!(view.editors.len(), 1);
    let EditorDescriptor::Select(select) = &view.editors[0] else {
        panic!("expected a select editor, got {:?}", view.editors[0]);
    };
    assert!(select.options.is_empty());
    assert!(select.props.editable);
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[tokio::test]
async fn editors_follow_viewable_order_and_scope() {
    let api = Arc::new(
        InMemoryMemberApi::new()
            .with_schema(
                SchemaRegistry::new()
                    .with("firstName", SchemaKind::String)
                    .with("active", SchemaKind::Boolean)
                    .with("joined", SchemaKind::Date)
                    .with("salary", SchemaKind::Number),
            )
            .with_enum_options(EnumOptions::new().with("status", ["Active", "Lapsed"]))
            .with_permissions(PermissionSet::new(
                ["joined", "firstName", "status", "notes", "active"],
                ["firstName", "salary"],
            )),
    );
    let id = api.insert_member(record(&[
        ("firstName", Value::from("Ada")),
        ("joined", Value::from("2024-02-29")),
        ("salary", Value::Int(100)),
    ]));
    let session = session_over(api, &["firstName"]);
    session.open(MemberRoute::Existing(id)).await.unwrap();

    let editors = session.view().editors;
    let attributes: Vec<_> = editors.iter().map(EditorDescriptor::attribute).collect();
    assert_eq!(attributes, ["joined", "firstName", "status", "notes", "active"]);

    assert!(matches!(
        &editors[0],
        EditorDescriptor::Date(d) if d.date.is_some() && !d.props.editable
    ));
    assert!(matches!(&editors[1], EditorDescriptor::Text(t) if t.required && t.props.editable));
    // "status" has options but no declared kind.
    assert!(matches!(&editors[2], EditorDescriptor::Placeholder { .. }));
    assert!(matches!(&editors[4], EditorDescriptor::Toggle(_)));
    assert!(editors[4].change(true).is_none());

    let change = editors[1].change("Augusta").unwrap();
    session.apply(change);
    assert_eq!(
        session.edit_set(),
        record(&[("firstName", Value::from("Augusta"))])
    );
}

#[tokio::test]
async fn failed_update_keeps_canonical_and_quotes_message() {
    let api = Arc::new(name_age_directory());
    let id = api.insert_member(record(&[("name", Value::from("Bob"))]));
    api.fail(
        ApiEndpoint::UpdateRecord,
        ApiError::Status {
            status: 422,
            message: Some("name already taken".to_string()),
        },
    );
    let session = session_over(api, &["name"]);
    session.open(MemberRoute::Existing(id)).await.unwrap();

    session.set_local_value("name", Value::from("Alice"));
    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { .. }));
    assert_eq!(
        session.notice(),
        Notice::Error("An error occurred: name already taken".to_string())
    );
    assert_eq!(session.upstream().get("name"), Some(&Value::from("Bob")));
    assert!(session.has_pending_changes());
    assert_eq!(session.view().notice_headline.as_deref(), Some("Update Failed!"));
}

// ---------------------------------------------------------------------------
// Timing and concurrency
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn success_notice_clears_after_four_seconds() {
    let api = Arc::new(name_age_directory());
    let id = api.insert_member(record(&[("name", Value::from("Bob"))]));
    let session = session_over(api, &["name"]);
    session.open(MemberRoute::Existing(id)).await.unwrap();

    session.set_local_value("name", Value::from("Bobby"));
    session.submit().await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_990)).await;
    assert_eq!(session.notice(), Notice::Success("User updated".to_string()));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(session.notice().is_none());
}

#[tokio::test(start_paused = true)]
async fn older_timer_does_not_clear_newer_notice() {
    let api = Arc::new(name_age_directory());
    let id = api.insert_member(record(&[("name", Value::from("Bob"))]));
    let session = session_over(api, &["name"]);
    session.open(MemberRoute::Existing(id)).await.unwrap();

    session.set_local_value("name", Value::from("Bobby"));
    session.submit().await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_000)).await;
    session.set_local_value("name", Value::from("Robert"));
    session.submit().await.unwrap();

    // First timer would have fired at 4s; the second notice must survive it.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(session.notice(), Notice::Success("User updated".to_string()));

    tokio::time::sleep(Duration::from_millis(3_000)).await;
    assert!(session.notice().is_none());
}

#[tokio::test(start_paused = true)]
async fn error_notice_is_not_cleared_by_timer() {
    let api = Arc::new(name_age_directory());
    let id = api.insert_member(record(&[("name", Value::from("Bob"))]));
    let session = session_over(api.clone(), &["name"]);
    session.open(MemberRoute::Existing(id)).await.unwrap();

    session.set_local_value("name", Value::from("Bobby"));
    session.submit().await.unwrap();

    api.fail(
        ApiEndpoint::UpdateRecord,
        ApiError::Transport {
            reason: "reset".to_string(),
        },
    );
    session.set_local_value("name", Value::from("Robert"));
    assert!(session.submit().await.is_err());

    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(session.notice(), Notice::Error("An error occurred.".to_string()));
}

#[tokio::test]
async fn concurrent_submit_is_rejected_while_in_flight() {
    let gated = Arc::new(GatedApi::new(name_age_directory()));
    let id = gated.inner.insert_member(record(&[("name", Value::from("Bob"))]));
    let session = session_over(gated.clone(), &["name"]);
    session.open(MemberRoute::Existing(id)).await.unwrap();
    session.set_local_value("name", Value::from("Bobby"));

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_phase(&session, SubmissionPhase::Submitting).await;

    assert!(session.view().submitting);
    assert!(!session.view().submit_enabled);
    assert_eq!(session.submit().await.unwrap_err(), SessionError::InFlight);

    gated.gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), SubmitOutcome::Updated);
    assert_eq!(gated.inner.call_count(ApiEndpoint::UpdateRecord), 1);
}

#[tokio::test]
async fn result_arriving_after_close_is_discarded() {
    let gated = Arc::new(GatedApi::new(name_age_directory()));
    let session = session_over(gated.clone(), &["name"]);
    session.open(MemberRoute::New).await.unwrap();
    session.set_local_value("name", Value::from("Ada"));

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_phase(&session, SubmissionPhase::Submitting).await;

    session.close();
    gated.gate.notify_one();

    assert_eq!(pending.await.unwrap().unwrap_err(), SessionError::Superseded);
    assert!(session.notice().is_none());
    assert_eq!(session.take_navigation(), None);
    assert_eq!(session.route(), Some(MemberRoute::New));
}

#[tokio::test]
async fn reopen_discards_submission_of_previous_member() {
    let gated = Arc::new(GatedApi::new(name_age_directory()));
    let first = gated.inner.insert_member(record(&[("name", Value::from("Bob"))]));
    let second = gated.inner.insert_member(record(&[("name", Value::from("Eve"))]));
    let session = session_over(gated.clone(), &["name"]);
    session.open(MemberRoute::Existing(first)).await.unwrap();
    session.set_local_value("name", Value::from("Bobby"));

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    wait_for_phase(&session, SubmissionPhase::Submitting).await;

    session.open(MemberRoute::Existing(second)).await.unwrap();
    gated.gate.notify_one();

    assert_eq!(pending.await.unwrap().unwrap_err(), SessionError::Superseded);
    assert_eq!(session.upstream().get("name"), Some(&Value::from("Eve")));
    assert_eq!(session.phase(), SubmissionPhase::Idle);
}
