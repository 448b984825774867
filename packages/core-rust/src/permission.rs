//! Per-session visibility and editability scoping over member attributes.

use serde::{Deserialize, Serialize};

/// Which attributes the acting user may see and change on one record.
///
/// `editable` is always a subset of `viewable`; construction drops any editable
/// name that is not viewable. The viewable order is the display order of the
/// generated form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PermissionsPayload", into = "PermissionsPayload")]
pub struct PermissionSet {
    viewable: Vec<String>,
    editable: Vec<String>,
}

/// Wire layout returned by the permissions endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PermissionsPayload {
    #[serde(default)]
    view: Vec<String>,
    #[serde(default)]
    edit: Vec<String>,
}

impl PermissionSet {
    /// Builds a permission set, deduplicating both lists (first occurrence wins)
    /// and discarding editable names that are not viewable.
    pub fn new<V, E>(viewable: V, editable: E) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let mut view: Vec<String> = Vec::new();
        for name in viewable {
            let name = name.into();
            if !view.contains(&name) {
                view.push(name);
            }
        }

        let mut edit: Vec<String> = Vec::new();
        for name in editable {
            let name = name.into();
            if !view.contains(&name) {
                tracing::warn!(
                    attribute = %name,
                    "dropping edit permission on non-viewable attribute"
                );
                continue;
            }
            if !edit.contains(&name) {
                edit.push(name);
            }
        }

        Self {
            viewable: view,
            editable: edit,
        }
    }

    /// Viewable attributes in display order.
    pub fn viewable(&self) -> impl Iterator<Item = &str> {
        self.viewable.iter().map(String::as_str)
    }

    /// Editable attributes in declaration order.
    pub fn editable(&self) -> impl Iterator<Item = &str> {
        self.editable.iter().map(String::as_str)
    }

    #[must_use]
    pub fn can_view(&self, attribute: &str) -> bool {
        self.viewable.iter().any(|a| a == attribute)
    }

    #[must_use]
    pub fn can_edit(&self, attribute: &str) -> bool {
        self.editable.iter().any(|a| a == attribute)
    }

    /// Returns `true` if at least one attribute is editable, i.e. the form
    /// offers a submit control at all.
    #[must_use]
    pub fn has_edit_rights(&self) -> bool {
        !self.editable.is_empty()
    }
}

impl From<PermissionsPayload> for PermissionSet {
    fn from(payload: PermissionsPayload) -> Self {
        Self::new(payload.view, payload.edit)
    }
}

impl From<PermissionSet> for PermissionsPayload {
    fn from(set: PermissionSet) -> Self {
        Self {
            view: set.viewable,
            edit: set.editable,
        }
    }
}
