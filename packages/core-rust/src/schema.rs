//! Schema kinds, enum options and required-field rules for member attributes.
//!
//! The persistence layer describes its schema as a mapping from type name to
//! the attributes declared with that type. Type names are resolved once,
//! through [`SchemaKind::from_type_name`], into a closed [`SchemaKind`] tag;
//! everything downstream matches on the tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Record, Value};

// ---------------------------------------------------------------------------
// SchemaKind
// ---------------------------------------------------------------------------

/// Declared data type of a member attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemaKind {
    Number,
    String,
    Boolean,
    Date,
    Enum,
}

/// Wire type names understood by the registry.
const TYPE_NAMES: [(&str, SchemaKind); 5] = [
    ("Number", SchemaKind::Number),
    ("String", SchemaKind::String),
    ("Boolean", SchemaKind::Boolean),
    ("Date", SchemaKind::Date),
    ("Enum", SchemaKind::Enum),
];

/// Resolution order when one attribute is declared under several kinds.
/// Earlier entries win.
pub const KIND_PRECEDENCE: [SchemaKind; 5] = [
    SchemaKind::Number,
    SchemaKind::Enum,
    SchemaKind::Boolean,
    SchemaKind::Date,
    SchemaKind::String,
];

impl SchemaKind {
    /// Looks up a wire type name. Unknown names (`ObjectId`, `Array`, ...)
    /// yield `None`.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        TYPE_NAMES
            .iter()
            .find(|(type_name, _)| *type_name == name)
            .map(|(_, kind)| *kind)
    }

    /// The wire type name of this kind.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            SchemaKind::Number => "Number",
            SchemaKind::String => "String",
            SchemaKind::Boolean => "Boolean",
            SchemaKind::Date => "Date",
            SchemaKind::Enum => "Enum",
        }
    }

    fn precedence(self) -> usize {
        KIND_PRECEDENCE
            .iter()
            .position(|k| *k == self)
            .unwrap_or(KIND_PRECEDENCE.len())
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// Attribute name to declared kind, fixed for the lifetime of an edit session.
///
/// Serializes to and from the wire layout `{ typeName: [attribute, ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct SchemaRegistry {
    kinds: BTreeMap<String, SchemaKind>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `attribute` with `kind`, keeping the higher-precedence kind if
    /// the attribute was already declared.
    pub fn declare(&mut self, attribute: impl Into<String>, kind: SchemaKind) {
        let attribute = attribute.into();
        match self.kinds.get(&attribute) {
            Some(existing) if existing.precedence() <= kind.precedence() => {}
            _ => {
                self.kinds.insert(attribute, kind);
            }
        }
    }

    /// Builder form of [`SchemaRegistry::declare`].
    #[must_use]
    pub fn with(mut self, attribute: impl Into<String>, kind: SchemaKind) -> Self {
        self.declare(attribute, kind);
        self
    }

    /// Kind of `attribute`, or `None` if the schema does not declare it.
    #[must_use]
    pub fn kind_of(&self, attribute: &str) -> Option<SchemaKind> {
        self.kinds.get(attribute).copied()
    }

    /// Number of declared attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl From<BTreeMap<String, Vec<String>>> for SchemaRegistry {
    fn from(by_type: BTreeMap<String, Vec<String>>) -> Self {
        let mut registry = Self::new();
        for (type_name, attributes) in by_type {
            let Some(kind) = SchemaKind::from_type_name(&type_name) else {
                tracing::debug!(type_name = %type_name, "ignoring unsupported schema type");
                continue;
            };
            for attribute in attributes {
                registry.declare(attribute, kind);
            }
        }
        registry
    }
}

impl From<SchemaRegistry> for BTreeMap<String, Vec<String>> {
    fn from(registry: SchemaRegistry) -> Self {
        let mut by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (attribute, kind) in registry.kinds {
            by_type
                .entry(kind.type_name().to_string())
                .or_default()
                .push(attribute);
        }
        by_type
    }
}

// ---------------------------------------------------------------------------
// EnumOptions
// ---------------------------------------------------------------------------

/// Allowed values of each Enum attribute, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumOptions {
    options: BTreeMap<String, Vec<String>>,
}

impl EnumOptions {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: sets the allowed values of `attribute`.
    #[must_use]
    pub fn with<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .insert(attribute.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Allowed values of `attribute`. Empty when none are defined.
    #[must_use]
    pub fn options_for(&self, attribute: &str) -> &[String] {
        self.options
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// RequiredFields
// ---------------------------------------------------------------------------

/// Attributes that must be non-blank before a record may be submitted.
///
/// Applies regardless of permission scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredFields {
    names: Vec<String>,
}

impl RequiredFields {
    /// Returns `true` if `attribute` is required.
    #[must_use]
    pub fn contains(&self, attribute: &str) -> bool {
        self.names.iter().any(|n| n == attribute)
    }

    /// Required names in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Checks `record` against the rule set.
    ///
    /// An attribute is missing when absent, null, or the empty string.
    #[must_use]
    pub fn check(&self, record: &Record) -> ValidationResult {
        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|name| record.get(name).map_or(true, Value::is_blank))
            .cloned()
            .collect();
        if missing.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { missing }
        }
    }
}

impl<S: Into<String>> FromIterator<S> for RequiredFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut names: Vec<String> = Vec::new();
        for name in iter {
            let name = name.into();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self { names }
    }
}

/// Result of validating a record against [`RequiredFields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Every required attribute holds a value.
    Valid,
    /// One or more required attributes are missing.
    Invalid {
        /// Missing attribute names, in declaration order.
        missing: Vec<String>,
    },
}

impl ValidationResult {
    /// Returns `true` for [`ValidationResult::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}
