//! Serializable snapshot of a profile session for the presentation layer.

use memberdir_core::{render_form, EditorDescriptor, MemberRoute, Notice, RequiredFields};
use serde::Serialize;

use super::submit::SubmissionPhase;
use super::SessionState;

/// Label of the submit control on a create form.
pub const CREATE_LABEL: &str = "Create User";
/// Label of the submit control on an update form.
pub const UPDATE_LABEL: &str = "Update";

/// Everything a profile page renders, computed from the session in one go.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    /// Location of the member (`/member/{id}` or `/member/new`); `None`
    /// before the first open.
    pub location: Option<String>,
    /// Persisted first and last name, e.g. `"Ada Lovelace"`.
    pub title: String,
    pub ready: bool,
    /// One editor per viewable attribute; empty until the session is ready.
    pub editors: Vec<EditorDescriptor>,
    pub has_pending_changes: bool,
    /// The user may edit at least one attribute.
    pub can_submit: bool,
    /// Submit control is active: edit rights, pending changes, nothing in flight.
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    pub submitting: bool,
    pub phase: SubmissionPhase,
    pub notice: Notice,
    pub notice_headline: Option<String>,
    /// Required attributes the last submission attempt found blank.
    pub missing_fields: Vec<String>,
}

impl SessionState {
    pub(crate) fn view(&self, required: &RequiredFields) -> ProfileView {
        let creating = !matches!(self.route, Some(MemberRoute::Existing(_)));
        let editors = if self.ready {
            render_form(
                &self.schema,
                &self.permissions,
                &self.enum_options,
                required,
                self.tracker.local(),
            )
        } else {
            Vec::new()
        };

        let has_pending_changes = self.tracker.has_pending_changes();
        let can_submit = self.ready && self.permissions.has_edit_rights();
        let submitting = self.phase.is_in_flight();

        ProfileView {
            location: self.route.as_ref().map(MemberRoute::location),
            title: self.title(),
            ready: self.ready,
            editors,
            has_pending_changes,
            can_submit,
            submit_enabled: can_submit && has_pending_changes && !submitting,
            submit_label: if creating { CREATE_LABEL } else { UPDATE_LABEL },
            submitting,
            phase: self.phase,
            notice_headline: self.notice.headline(self.notice_creating),
            notice: self.notice.clone(),
            missing_fields: self.missing.clone(),
        }
    }

    fn title(&self) -> String {
        let upstream = self.tracker.upstream();
        let part = |attribute: &str| {
            upstream
                .get(attribute)
                .map(ToString::to_string)
                .unwrap_or_default()
        };
        format!("{} {}", part("firstName"), part("lastName"))
            .trim()
            .to_string()
    }
}
