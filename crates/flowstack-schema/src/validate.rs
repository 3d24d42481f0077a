//! # Schema Validation
//!
//! Runtime structural validation of flow schema documents: a schema must
//! describe a non-empty, well-typed tree of sections → forms → fields.
//!
//! ## Validation Invariant
//!
//! Schema validation is a persistence boundary. A flow's `json_schema`
//! column is stored verbatim, so every document must be checked before the
//! write: the top level must be a JSON object with a non-empty `sections`
//! array, and every section, form, and field must satisfy its required
//! keys. Violations are accumulated — the caller receives the complete
//! list of problems in one pass, not just the first.
//!
//! ## Phases
//!
//! 1. **Structural parse** — empty input and unparseable text are fatal;
//!    a non-object top level is reported and validation stops, since the
//!    required-fields walk has nothing usable to traverse.
//! 2. **Required-fields walk** — depth-first, left-to-right over
//!    `sections`, numbering elements from 1 in messages. A non-object
//!    element is reported once and not descended into.

use std::fmt;

use serde_json::{Map, Value};

/// Candidate input for schema validation.
///
/// Callers hold the schema in one of three shapes: an already-parsed JSON
/// value (the usual case — the request body was deserialized upstream), a
/// string of serialized JSON (a text column re-validated on update), or
/// nothing at all. The `From` impls below normalize all three so handlers
/// can pass whatever they have.
#[derive(Debug, Clone, Copy)]
pub enum SchemaCandidate<'a> {
    /// No schema supplied (missing key, JSON `null`).
    Absent,
    /// Serialized JSON text, not yet parsed.
    Text(&'a str),
    /// An already-parsed JSON value.
    Value(&'a Value),
}

impl<'a> From<&'a Value> for SchemaCandidate<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            // A JSON string is treated as serialized JSON: the original
            // builder posts the schema both ways, and a text column holding
            // a serialized document must revalidate identically.
            Value::String(text) => Self::Text(text),
            other => Self::Value(other),
        }
    }
}

impl<'a> From<Option<&'a Value>> for SchemaCandidate<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        match value {
            None => Self::Absent,
            Some(v) => v.into(),
        }
    }
}

impl<'a> From<&'a str> for SchemaCandidate<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

/// Outcome of validating one candidate schema.
///
/// Wraps the ordered list of violation messages. The document is valid
/// iff the list is empty. Ordering is significant: messages appear in
/// ascending section order, and within a section the section's own
/// violations precede its forms', which precede their fields'.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    errors: Vec<String>,
}

impl Validation {
    /// Whether the candidate passed every check.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the accumulated violation messages, in report order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes self and returns the inner message list.
    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{message}")?;
        }
        Ok(())
    }
}

/// Returns true if any of the named keys holds a present value.
///
/// "Present" means: the key exists, the value is not `null`, and — when
/// the value is a string — it is not blank or whitespace-only. Any other
/// JSON type (number, bool, array, object) counts as present.
pub fn has_non_empty(map: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| map.get(*key).is_some_and(is_present))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Stateless structural validator for flow schema documents.
///
/// Holds no state across calls: each invocation accumulates its own
/// error list and returns it as a [`Validation`]. Safe to call from
/// concurrent request handlers without coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validate a candidate schema and return every violation found.
    ///
    /// Accepts anything convertible to [`SchemaCandidate`]: a parsed
    /// `&Value`, an `Option<&Value>`, or a `&str` of serialized JSON.
    ///
    /// Empty input and unparseable text stop validation immediately with
    /// a single message. A non-object top level also stops with a single
    /// `"schema must be an object"` — the walk is not attempted against
    /// a value that cannot hold a `sections` key, so no redundant
    /// missing-sections message is emitted.
    pub fn validate<'a>(candidate: impl Into<SchemaCandidate<'a>>) -> Validation {
        let mut errors = Vec::new();

        // Phase 1 — structural parse.
        let owned;
        let document = match candidate.into() {
            SchemaCandidate::Absent => {
                errors.push("schema must not be empty".to_string());
                return Validation { errors };
            }
            SchemaCandidate::Text(text) => {
                if text.trim().is_empty() {
                    errors.push("schema must not be empty".to_string());
                    return Validation { errors };
                }
                match serde_json::from_str::<Value>(text) {
                    Ok(value) => {
                        owned = value;
                        &owned
                    }
                    Err(_) => {
                        errors.push("schema must be valid JSON".to_string());
                        return Validation { errors };
                    }
                }
            }
            SchemaCandidate::Value(value) => value,
        };

        let Some(root) = document.as_object() else {
            errors.push("schema must be an object".to_string());
            return Validation { errors };
        };

        // Phase 2 — required-fields walk.
        match root.get("sections").and_then(Value::as_array) {
            Some(sections) if !sections.is_empty() => {
                for (index, section) in sections.iter().enumerate() {
                    validate_section(section, index + 1, &mut errors);
                }
            }
            _ => errors.push("schema must contain at least one section".to_string()),
        }

        Validation { errors }
    }
}

/// Validate one element of `sections`, numbered from 1.
fn validate_section(section: &Value, section_no: usize, errors: &mut Vec<String>) {
    let Some(map) = section.as_object() else {
        errors.push(format!("Section {section_no} must be an object"));
        return;
    };

    // The builder emits `id`/`title`; hand-written documents may carry
    // only `name`. Either satisfies both requirements.
    if !has_non_empty(map, &["id", "name"]) {
        errors.push(format!("Section {section_no} must have an ID or name"));
    }
    if !has_non_empty(map, &["title", "name"]) {
        errors.push(format!("Section {section_no} must have a title or name"));
    }

    if let Some(forms) = map.get("forms").and_then(Value::as_array) {
        for (index, form) in forms.iter().enumerate() {
            validate_form(form, index + 1, section_no, errors);
        }
    }
}

/// Validate one element of a section's `forms`, numbered from 1.
fn validate_form(form: &Value, form_no: usize, section_no: usize, errors: &mut Vec<String>) {
    let Some(map) = form.as_object() else {
        errors.push(format!("Form {form_no} of section {section_no} must be an object"));
        return;
    };

    if !has_non_empty(map, &["id", "name"]) {
        errors.push(format!(
            "Form {form_no} of section {section_no} must have an ID or name"
        ));
    }

    if let Some(fields) = map.get("fields").and_then(Value::as_array) {
        for (index, field) in fields.iter().enumerate() {
            validate_field(field, index + 1, form_no, section_no, errors);
        }
    }
}

/// Validate one element of a form's `fields`, numbered from 1.
fn validate_field(
    field: &Value,
    field_no: usize,
    form_no: usize,
    section_no: usize,
    errors: &mut Vec<String>,
) {
    let Some(map) = field.as_object() else {
        errors.push(format!(
            "Field {field_no} of form {form_no} of section {section_no} must be an object"
        ));
        return;
    };

    if !has_non_empty(map, &["id", "name"]) {
        errors.push(format!(
            "Field {field_no} of form {form_no} of section {section_no} must have an ID or name"
        ));
    }
    if !has_non_empty(map, &["type"]) {
        errors.push(format!(
            "Field {field_no} of form {form_no} of section {section_no} must have a type"
        ));
    }
}
