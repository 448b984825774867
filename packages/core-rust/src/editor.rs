//! Attribute editor dispatch.
//!
//! Turns each viewable attribute of a member into an [`EditorDescriptor`]: a
//! tagged union the presentation layer matches exhaustively to pick a widget.
//! Dispatch is pure; it reads the schema kind, the current working value, the
//! enum options and the permission scope, and never fails. Widgets report user
//! input back through [`EditorDescriptor::change`], which yields an
//! [`AttributeChange`] for the record state tracker to apply.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::permission::PermissionSet;
use crate::schema::{EnumOptions, RequiredFields, SchemaKind, SchemaRegistry};
use crate::types::{Record, Value};

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Properties shared by every editor variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorProps {
    /// Attribute this editor is bound to.
    pub attribute: String,
    /// Current working value, `None` when the record does not hold the attribute.
    pub value: Option<Value>,
    /// Whether the acting user may change the attribute.
    pub editable: bool,
}

/// Free-text editor, used for both Number and String attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEditor {
    #[serde(flatten)]
    pub props: EditorProps,
    pub required: bool,
}

/// On/off editor for Boolean attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleEditor {
    #[serde(flatten)]
    pub props: EditorProps,
}

/// Date picker. `date` is the working value parsed from its literal form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateEditor {
    #[serde(flatten)]
    pub props: EditorProps,
    pub required: bool,
    pub date: Option<DateTime<Utc>>,
}

/// Single-select editor for Enum attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectEditor {
    #[serde(flatten)]
    pub props: EditorProps,
    /// Allowed values in display order. Empty when the directory defines none.
    pub options: Vec<String>,
}

impl SelectEditor {
    /// Picks one of the offered options. Values outside `options` are refused.
    #[must_use]
    pub fn choose(&self, option: &str) -> Option<AttributeChange> {
        if !self.props.editable || !self.options.iter().any(|o| o == option) {
            return None;
        }
        Some(AttributeChange::new(&self.props.attribute, Value::from(option)))
    }
}

impl DateEditor {
    /// Sets the date, stored as an RFC 3339 literal with millisecond precision.
    #[must_use]
    pub fn change_to(&self, date: DateTime<Utc>) -> Option<AttributeChange> {
        if !self.props.editable {
            return None;
        }
        Some(AttributeChange::new(
            &self.props.attribute,
            Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ))
    }
}

/// Editor chosen for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "editor", rename_all = "camelCase")]
pub enum EditorDescriptor {
    /// Numeric text input.
    Number(TextEditor),
    /// Plain text input.
    Text(TextEditor),
    /// Boolean toggle.
    Toggle(ToggleEditor),
    /// Date picker.
    Date(DateEditor),
    /// Single select over enum options.
    Select(SelectEditor),
    /// Attribute without a known kind: renders nothing but keeps its slot.
    Placeholder { attribute: String },
}

impl EditorDescriptor {
    /// Attribute this editor is bound to.
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            EditorDescriptor::Number(e) | EditorDescriptor::Text(e) => &e.props.attribute,
            EditorDescriptor::Toggle(e) => &e.props.attribute,
            EditorDescriptor::Date(e) => &e.props.attribute,
            EditorDescriptor::Select(e) => &e.props.attribute,
            EditorDescriptor::Placeholder { attribute } => attribute,
        }
    }

    /// Shared props, absent for placeholders.
    #[must_use]
    pub fn props(&self) -> Option<&EditorProps> {
        match self {
            EditorDescriptor::Number(e) | EditorDescriptor::Text(e) => Some(&e.props),
            EditorDescriptor::Toggle(e) => Some(&e.props),
            EditorDescriptor::Date(e) => Some(&e.props),
            EditorDescriptor::Select(e) => Some(&e.props),
            EditorDescriptor::Placeholder { .. } => None,
        }
    }

    /// Schema kind the editor was dispatched for.
    #[must_use]
    pub fn kind(&self) -> Option<SchemaKind> {
        match self {
            EditorDescriptor::Number(_) => Some(SchemaKind::Number),
            EditorDescriptor::Text(_) => Some(SchemaKind::String),
            EditorDescriptor::Toggle(_) => Some(SchemaKind::Boolean),
            EditorDescriptor::Date(_) => Some(SchemaKind::Date),
            EditorDescriptor::Select(_) => Some(SchemaKind::Enum),
            EditorDescriptor::Placeholder { .. } => None,
        }
    }

    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.props().is_some_and(|p| p.editable)
    }

    /// Change callback: wraps `value` as a change to this editor's attribute.
    ///
    /// Disabled editors and placeholders produce nothing.
    #[must_use]
    pub fn change(&self, value: impl Into<Value>) -> Option<AttributeChange> {
        let props = self.props()?;
        if !props.editable {
            return None;
        }
        Some(AttributeChange::new(&props.attribute, value.into()))
    }
}

/// A user edit to one attribute, emitted by an editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeChange {
    pub attribute: String,
    pub value: Value,
}

impl AttributeChange {
    #[must_use]
    pub fn new(attribute: &str, value: Value) -> Self {
        Self {
            attribute: attribute.to_string(),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Everything dispatch needs to know about one attribute.
#[derive(Debug, Clone, Copy)]
pub struct EditorInput<'a> {
    pub attribute: &'a str,
    pub kind: Option<SchemaKind>,
    pub value: Option<&'a Value>,
    pub options: &'a [String],
    pub editable: bool,
    pub required: bool,
}

/// Chooses the editor for a single attribute.
#[must_use]
pub fn dispatch(input: EditorInput<'_>) -> EditorDescriptor {
    let Some(kind) = input.kind else {
        return EditorDescriptor::Placeholder {
            attribute: input.attribute.to_string(),
        };
    };

    let props = EditorProps {
        attribute: input.attribute.to_string(),
        value: input.value.cloned(),
        editable: input.editable,
    };

    match kind {
        SchemaKind::Number => EditorDescriptor::Number(TextEditor {
            props,
            required: input.required,
        }),
        SchemaKind::String => EditorDescriptor::Text(TextEditor {
            props,
            required: input.required,
        }),
        SchemaKind::Boolean => EditorDescriptor::Toggle(ToggleEditor { props }),
        SchemaKind::Date => EditorDescriptor::Date(DateEditor {
            date: input.value.and_then(parse_date_literal),
            props,
            required: input.required,
        }),
        SchemaKind::Enum => EditorDescriptor::Select(SelectEditor {
            props,
            options: input.options.to_vec(),
        }),
    }
}

/// Builds the editors of a form, one per viewable attribute, in the
/// permission set's viewable order.
#[must_use]
pub fn render_form(
    schema: &SchemaRegistry,
    permissions: &PermissionSet,
    enum_options: &EnumOptions,
    required: &RequiredFields,
    record: &Record,
) -> Vec<EditorDescriptor> {
    permissions
        .viewable()
        .map(|attribute| {
            dispatch(EditorInput {
                attribute,
                kind: schema.kind_of(attribute),
                value: record.get(attribute),
                options: enum_options.options_for(attribute),
                editable: permissions.can_edit(attribute),
                required: required.contains(attribute),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Literal parsing
// ---------------------------------------------------------------------------

/// Parses a stored date value.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC),
/// bare `YYYY-MM-DD` dates (midnight UTC) and integer epoch milliseconds.
/// Anything else yields `None`.
#[must_use]
pub fn parse_date_literal(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        Value::Int(millis) => DateTime::from_timestamp_millis(*millis),
        _ => None,
    }
}

/// Raw widget text that cannot be read as the attribute's kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("not a number: {raw:?}")]
    NotANumber { raw: String },
    #[error("not a boolean (expected true or false): {raw:?}")]
    NotABoolean { raw: String },
    #[error("not a date: {raw:?}")]
    NotADate { raw: String },
}

impl SchemaKind {
    /// Converts raw widget text into a typed value for this kind.
    ///
    /// Empty Number and Date input clears the attribute (null). String and Enum
    /// input is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] when the text is not a valid number, boolean
    /// or date literal.
    pub fn parse_input(self, raw: &str) -> Result<Value, InputError> {
        match self {
            SchemaKind::Number => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(Value::Int(i));
                }
                match trimmed.parse::<f64>() {
                    Ok(x) if x.is_finite() => Ok(Value::Float(x)),
                    _ => Err(InputError::NotANumber {
                        raw: raw.to_string(),
                    }),
                }
            }
            SchemaKind::Boolean => match raw.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(InputError::NotABoolean {
                    raw: raw.to_string(),
                }),
            },
            SchemaKind::Date => {
                if raw.trim().is_empty() {
                    return Ok(Value::Null);
                }
                parse_date_literal(&Value::from(raw))
                    .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
                    .ok_or_else(|| InputError::NotADate {
                        raw: raw.to_string(),
                    })
            }
            SchemaKind::String | SchemaKind::Enum => Ok(Value::from(raw)),
        }
    }
}
