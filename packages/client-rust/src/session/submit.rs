//! Submission coordination: validation, create-or-update, reconciliation.

use std::sync::Arc;
use std::time::Duration;

use memberdir_core::notice::{MEMBER_CREATED, MEMBER_UPDATED};
use memberdir_core::{ApiError, MemberRoute, Notice, Record, RecordId, RequiredFields};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::SessionState;
use crate::error::SessionError;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a session stands in the submission cycle.
///
/// `Idle -> Validating -> Submitting -> Succeeded | Failed`. A blank required
/// field sends `Validating` straight back to `Idle`. The terminal phases act
/// as idle: the next edit or submission starts over from `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionPhase {
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, SubmissionPhase::Submitting)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new member was created; the view should move to `location`.
    Created { id: RecordId, location: String },
    /// An existing member was updated in place.
    Updated,
}

/// Everything captured when a submission leaves the session lock.
#[derive(Debug)]
pub(crate) struct SubmitRequest {
    pub(crate) route: MemberRoute,
    pub(crate) fields: Record,
    pub(crate) epoch: u64,
    pub(crate) cancel: CancellationToken,
}

// ---------------------------------------------------------------------------
// State transitions
// ---------------------------------------------------------------------------

impl SessionState {
    pub(crate) fn set_phase(&mut self, next: SubmissionPhase) {
        if self.phase != next {
            tracing::debug!(from = ?self.phase, to = ?next, "submission phase");
            self.phase = next;
        }
    }

    /// Validates the working copy and, if it passes, moves to `Submitting`
    /// and returns what the call needs.
    pub(crate) fn begin_submission(
        &mut self,
        required: &RequiredFields,
    ) -> Result<SubmitRequest, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if self.phase.is_in_flight() {
            return Err(SessionError::InFlight);
        }
        let Some(route) = self.route.clone().filter(|_| self.ready) else {
            return Err(SessionError::NotReady);
        };

        self.set_phase(SubmissionPhase::Idle);
        self.set_phase(SubmissionPhase::Validating);
        let missing = self.tracker.missing_required(required);
        if !missing.is_empty() {
            tracing::debug!(?missing, "required fields blank, submission skipped");
            self.missing.clone_from(&missing);
            self.set_phase(SubmissionPhase::Idle);
            return Err(SessionError::MissingRequired { fields: missing });
        }
        self.missing.clear();

        self.notice_timer.cancel();
        self.set_phase(SubmissionPhase::Submitting);
        Ok(SubmitRequest {
            fields: self.tracker.compute_edit_set(&self.permissions),
            route,
            epoch: self.epoch,
            cancel: self.cancel.clone(),
        })
    }
}

/// Applies the outcome of a create/update call to the shared session state.
///
/// Results from an older epoch are discarded. On success the server record
/// becomes canonical, a create moves the route to the new identity and
/// queues navigation, and a success notice is scheduled to clear after `ttl`.
pub(crate) fn finish_submission(
    shared: &Arc<Mutex<SessionState>>,
    request: SubmitRequest,
    response: Result<Record, ApiError>,
    ttl: Duration,
) -> Result<SubmitOutcome, SessionError> {
    let mut state = shared.lock();
    if state.epoch != request.epoch {
        tracing::debug!(
            captured = request.epoch,
            current = state.epoch,
            "discarding stale submission result"
        );
        return Err(SessionError::Superseded);
    }

    let creating = request.route.is_new();
    let operation = if creating { "create" } else { "update" };

    let response = response.and_then(|record| {
        let created = if creating {
            Some(identity_of_created(&record)?)
        } else {
            None
        };
        Ok((record, created))
    });

    match response {
        Ok((record, created)) => {
            let outcome = match created {
                Some(id) => {
                    let route = MemberRoute::Existing(id.clone());
                    let location = route.location();
                    state.route = Some(route);
                    state.navigation = Some(location.clone());
                    SubmitOutcome::Created { id, location }
                }
                None => SubmitOutcome::Updated,
            };

            state.tracker.reconcile(record);
            let text = if creating { MEMBER_CREATED } else { MEMBER_UPDATED };
            state.set_notice(Notice::Success(text.to_string()), creating);
            state.set_phase(SubmissionPhase::Succeeded);
            schedule_notice_clear(shared, &mut state, ttl);

            metrics::counter!(
                "memberdir_submissions_total",
                "operation" => operation,
                "outcome" => "ok"
            )
            .increment(1);
            tracing::info!(operation, "member saved");
            Ok(outcome)
        }
        Err(source) => {
            let notice = Notice::submission_failed(source.detail());
            let message = notice.text().unwrap_or_default().to_string();
            state.set_notice(notice, creating);
            state.set_phase(SubmissionPhase::Failed);

            metrics::counter!(
                "memberdir_submissions_total",
                "operation" => operation,
                "outcome" => "error"
            )
            .increment(1);
            tracing::warn!(operation, error = %source, "member submission failed");
            Err(SessionError::Rejected { message, source })
        }
    }
}

/// Arms the notice timer. The callback holds only a weak handle, so a
/// dropped session is never kept alive by its timer.
fn schedule_notice_clear(
    shared: &Arc<Mutex<SessionState>>,
    state: &mut SessionState,
    ttl: Duration,
) {
    let weak = Arc::downgrade(shared);
    state.notice_timer.schedule(ttl, move |generation| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut state = shared.lock();
        if state.notice_timer.fire(generation) && matches!(state.notice, Notice::Success(_)) {
            tracing::debug!("success notice expired");
            state.notice = Notice::None;
        }
    });
}

/// Identity the directory assigned to a newly created member.
fn identity_of_created(record: &Record) -> Result<RecordId, ApiError> {
    record.id().ok_or_else(|| ApiError::Decode {
        reason: "created member carries no identity".to_string(),
    })
}
