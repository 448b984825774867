//! Profile sessions: one open member form, from loading to submission.
//!
//! A [`ProfileSession`] owns the state of a single profile view. Opening it
//! loads schema kinds, enum options, permissions and (for an existing member)
//! the record concurrently; the user then edits the working copy and submits
//! it. All state sits behind one `parking_lot::Mutex` that is never held
//! across an await, so the session can be shared between tasks.
//!
//! Every open and close starts a new epoch. Results of fetches and
//! submissions that were started under an older epoch are discarded, and the
//! epoch's `CancellationToken` lets those calls stop early.

mod loader;
mod notice_timer;
mod submit;
mod view;

use std::sync::Arc;
use std::time::Duration;

use memberdir_core::notice::RETRIEVAL_FAILED;
use memberdir_core::{
    settle, AttributeChange, EnumOptions, MemberApi, MemberRoute, Notice, PermissionSet, Record,
    RecordStateTracker, SchemaKind, SchemaRegistry, SessionContext, Value,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

pub use loader::{load_profile, ProfileData};
pub use notice_timer::NoticeTimer;
pub use submit::{SubmissionPhase, SubmitOutcome};
pub use view::{ProfileView, CREATE_LABEL, UPDATE_LABEL};

use crate::error::SessionError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Mutable state of one profile view.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    epoch: u64,
    cancel: CancellationToken,
    closed: bool,
    route: Option<MemberRoute>,
    ready: bool,
    schema: SchemaRegistry,
    permissions: PermissionSet,
    enum_options: EnumOptions,
    tracker: RecordStateTracker,
    phase: SubmissionPhase,
    notice: Notice,
    /// Whether the current notice was raised by a create form.
    notice_creating: bool,
    notice_timer: NoticeTimer,
    missing: Vec<String>,
    navigation: Option<String>,
}

impl SessionState {
    /// Starts a new epoch, cancelling work captured under the previous one.
    fn advance_epoch(&mut self) -> (u64, CancellationToken) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        if self.phase.is_in_flight() {
            self.set_phase(SubmissionPhase::Idle);
        }
        (self.epoch, self.cancel.clone())
    }

    fn set_notice(&mut self, notice: Notice, creating: bool) {
        self.notice = notice;
        self.notice_creating = creating;
    }

    /// Replaces everything the form shows with freshly loaded data.
    fn adopt(&mut self, route: MemberRoute, data: ProfileData) {
        self.schema = data.schema;
        self.permissions = data.permissions;
        self.enum_options = data.enum_options;
        self.tracker = data
            .record
            .map(RecordStateTracker::from_upstream)
            .unwrap_or_default();
        self.route = Some(route);
        self.ready = true;
        self.missing.clear();
        if matches!(self.notice, Notice::Error(_)) {
            self.notice = Notice::None;
        }
    }

    /// Bookkeeping after the user edited `attribute`: a finished submission
    /// goes back to idle, and a flagged required field is unflagged once it
    /// holds a value.
    fn edited(&mut self, attribute: &str) {
        if matches!(
            self.phase,
            SubmissionPhase::Succeeded | SubmissionPhase::Failed
        ) {
            self.set_phase(SubmissionPhase::Idle);
        }
        let filled = self
            .tracker
            .local()
            .get(attribute)
            .is_some_and(|value| !value.is_blank());
        if filled {
            self.missing.retain(|name| name != attribute);
        }
    }
}

// ---------------------------------------------------------------------------
// ProfileSession
// ---------------------------------------------------------------------------

/// Handle to one profile view. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProfileSession {
    ctx: Arc<SessionContext>,
    api: Arc<dyn MemberApi>,
    state: Arc<Mutex<SessionState>>,
}

impl ProfileSession {
    #[must_use]
    pub fn new(ctx: SessionContext, api: Arc<dyn MemberApi>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            api,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Loads the member addressed by `route` and makes the form usable.
    ///
    /// A success notice still showing (e.g. from the create that led here)
    /// is kept; an error notice is cleared.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Retrieval`] if any fetch failed. The error notice is
    ///   set and the previously loaded state stays as it was.
    /// - [`SessionError::Superseded`] if the session was reopened or closed
    ///   while loading.
    /// - [`SessionError::Closed`] if the session was closed.
    pub async fn open(&self, route: MemberRoute) -> Result<(), SessionError> {
        let (epoch, cancel) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(SessionError::Closed);
            }
            state.advance_epoch()
        };

        let span = info_span!(
            "profile_open",
            trace_id = %self.ctx.trace_id,
            principal = self.ctx.principal_id(),
            member = %route,
            epoch,
        );
        async {
            let loaded = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SessionError::Superseded),
                loaded = load_profile(self.api.as_ref(), &route) => loaded,
            };

            let mut state = self.state.lock();
            if state.epoch != epoch {
                tracing::debug!(current = state.epoch, "discarding stale profile load");
                return Err(SessionError::Superseded);
            }
            match loaded {
                Ok(data) => {
                    state.adopt(route, data);
                    tracing::debug!("profile loaded");
                    Ok(())
                }
                Err(source) => {
                    tracing::warn!(error = %source, "failed to load profile");
                    state.set_notice(Notice::Error(RETRIEVAL_FAILED.to_string()), route.is_new());
                    Err(SessionError::Retrieval { source })
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Replaces one attribute of the working copy.
    pub fn set_local_value(&self, attribute: impl Into<String>, value: Value) {
        let attribute = attribute.into();
        let mut state = self.state.lock();
        state.tracker.set_local_value(attribute.clone(), value);
        state.edited(&attribute);
    }

    /// Applies a change emitted by one of the view's editors.
    pub fn apply(&self, change: AttributeChange) {
        let attribute = change.attribute.clone();
        let mut state = self.state.lock();
        state.tracker.apply(change);
        state.edited(&attribute);
    }

    /// Parses raw widget text by the attribute's schema kind and stores it.
    /// Attributes without a known kind are stored as text.
    ///
    /// # Errors
    ///
    /// Returns [`memberdir_core::editor::InputError`] when the text does not
    /// fit the kind; the working copy is left unchanged.
    pub fn set_input(
        &self,
        attribute: &str,
        raw: &str,
    ) -> Result<(), memberdir_core::editor::InputError> {
        let mut state = self.state.lock();
        let kind = state.schema.kind_of(attribute).unwrap_or(SchemaKind::String);
        let value = kind.parse_input(raw)?;
        state.tracker.set_local_value(attribute, value);
        state.edited(attribute);
        Ok(())
    }

    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.state.lock().tracker.has_pending_changes()
    }

    /// Payload the next submission would send.
    #[must_use]
    pub fn edit_set(&self) -> Record {
        let state = self.state.lock();
        state.tracker.compute_edit_set(&state.permissions)
    }

    /// Validates the working copy and creates or updates the member.
    ///
    /// # Errors
    ///
    /// - [`SessionError::MissingRequired`] if a required attribute is blank;
    ///   nothing is sent and the notice is left alone.
    /// - [`SessionError::InFlight`] if another submission has not finished.
    /// - [`SessionError::NotReady`] / [`SessionError::Closed`] if no member
    ///   is loaded.
    /// - [`SessionError::Rejected`] if the directory call failed; the error
    ///   notice is set and the canonical record is unchanged.
    /// - [`SessionError::Superseded`] if the session was reopened or closed
    ///   before the result arrived.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        let request = self.state.lock().begin_submission(&self.ctx.required)?;

        let span = info_span!(
            "profile_submit",
            trace_id = %self.ctx.trace_id,
            principal = self.ctx.principal_id(),
            member = %request.route,
            epoch = request.epoch,
        );
        async {
            let cancel = request.cancel.clone();
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SessionError::Superseded),
                response = self.send(&request) => response,
            };
            submit::finish_submission(
                &self.state,
                request,
                response,
                Duration::from_millis(self.ctx.success_notice_ms),
            )
        }
        .instrument(span)
        .await
    }

    async fn send(
        &self,
        request: &submit::SubmitRequest,
    ) -> Result<Record, memberdir_core::ApiError> {
        match request.route.id() {
            Some(id) => settle(self.api.update_record(&request.fields, id).await),
            None => settle(self.api.create_record(&request.fields).await),
        }
    }

    /// Snapshot of everything the page renders.
    #[must_use]
    pub fn view(&self) -> ProfileView {
        self.state.lock().view(&self.ctx.required)
    }

    /// Location to navigate to after a create. Yields it once.
    #[must_use]
    pub fn take_navigation(&self) -> Option<String> {
        self.state.lock().navigation.take()
    }

    /// Leaves the view: pending results are discarded, the notice timer is
    /// cancelled and further calls fail with [`SessionError::Closed`].
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.advance_epoch();
        state.notice_timer.cancel();
        state.closed = true;
        state.ready = false;
        tracing::debug!(trace_id = %self.ctx.trace_id, "profile session closed");
    }

    #[must_use]
    pub fn phase(&self) -> SubmissionPhase {
        self.state.lock().phase
    }

    #[must_use]
    pub fn notice(&self) -> Notice {
        self.state.lock().notice.clone()
    }

    #[must_use]
    pub fn route(&self) -> Option<MemberRoute> {
        self.state.lock().route.clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    /// Persisted version of the member.
    #[must_use]
    pub fn upstream(&self) -> Record {
        self.state.lock().tracker.upstream().clone()
    }

    /// Working copy of the member.
    #[must_use]
    pub fn local(&self) -> Record {
        self.state.lock().tracker.local().clone()
    }
}

impl std::fmt::Debug for ProfileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSession")
            .field("trace_id", &self.ctx.trace_id)
            .field("route", &self.route())
            .finish_non_exhaustive()
    }
}
