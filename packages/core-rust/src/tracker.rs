//! Upstream/local record tracking for one edit session.

use crate::editor::AttributeChange;
use crate::permission::PermissionSet;
use crate::schema::{RequiredFields, ValidationResult};
use crate::types::{Record, Value};

/// Holds the last persisted version of a member (`upstream`) next to the
/// working copy the user edits (`local`).
///
/// User edits only ever touch `local`. `upstream` moves solely through
/// [`RecordStateTracker::reconcile`], after the directory confirmed a write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStateTracker {
    upstream: Record,
    local: Record,
}

impl RecordStateTracker {
    /// Tracker for a member that does not exist yet: both copies empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker seeded with a fetched record; the working copy starts equal to it.
    #[must_use]
    pub fn from_upstream(record: Record) -> Self {
        Self {
            local: record.clone(),
            upstream: record,
        }
    }

    #[must_use]
    pub fn upstream(&self) -> &Record {
        &self.upstream
    }

    #[must_use]
    pub fn local(&self) -> &Record {
        &self.local
    }

    /// Replaces one attribute of the working copy. Never fails and performs
    /// no validation.
    pub fn set_local_value(&mut self, attribute: impl Into<String>, value: Value) {
        self.local.insert(attribute, value);
    }

    /// Applies a change emitted by an editor.
    pub fn apply(&mut self, change: AttributeChange) {
        self.set_local_value(change.attribute, change.value);
    }

    /// Returns `true` if the working copy differs from the persisted one.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.local != self.upstream
    }

    /// The payload of a create/update call: working values of editable
    /// attributes only. Attributes the working copy lacks are omitted.
    #[must_use]
    pub fn compute_edit_set(&self, permissions: &PermissionSet) -> Record {
        permissions
            .editable()
            .filter_map(|attribute| {
                self.local
                    .get(attribute)
                    .map(|value| (attribute, value.clone()))
            })
            .collect()
    }

    /// Required attributes the working copy leaves blank, in declaration order.
    #[must_use]
    pub fn missing_required(&self, required: &RequiredFields) -> Vec<String> {
        match required.check(&self.local) {
            ValidationResult::Valid => Vec::new(),
            ValidationResult::Invalid { missing } => missing,
        }
    }

    /// Adopts the canonical record returned by the directory after a
    /// successful write. Both copies become that record.
    pub fn reconcile(&mut self, canonical: Record) {
        self.local = canonical.clone();
        self.upstream = canonical;
    }
}
