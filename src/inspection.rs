//! Schema compliance inspection
//!
//! Turns JSON Schema violations in a resource document into diagnostics a host
//! editor can render inline. The mapping is looked up on every pass, so an
//! added, replaced or removed mapping takes effect on the next edit.

use std::fmt;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::mapping::SchemaMappingRegistry;
use crate::resource::{DynamicResourceIdentifier, SessionId};
use crate::schema::SchemaDocument;

// =============================================================================
// Diagnostics
// =============================================================================

/// What kind of constraint a value broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Value is not one of the `enum` values
    NotInAllowedSet,
    /// Value is outside `minimum`/`maximum` bounds
    OutOfRange,
    WrongType,
    MissingRequired,
    UnexpectedProperty,
    Other,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInAllowedSet => "not_in_allowed_set",
            Self::OutOfRange => "out_of_range",
            Self::WrongType => "wrong_type",
            Self::MissingRequired => "missing_required",
            Self::UnexpectedProperty => "unexpected_property",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single schema violation in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// JSON pointer to the offending value (`/RetentionInDays`); empty for the root
    pub pointer: String,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.pointer.is_empty() { "/" } else { &self.pointer };
        write!(f, "{} [{}]: {}", at, self.kind, self.message)
    }
}

impl Diagnostic {
    fn from_validation_error(error: &ValidationError<'_>) -> Self {
        let (kind, message) = match &error.kind {
            ValidationErrorKind::Enum { options } => {
                (DiagnosticKind::NotInAllowedSet, allowed_values_message(options))
            }
            ValidationErrorKind::Minimum { .. }
            | ValidationErrorKind::Maximum { .. }
            | ValidationErrorKind::ExclusiveMinimum { .. }
            | ValidationErrorKind::ExclusiveMaximum { .. } => {
                (DiagnosticKind::OutOfRange, error.to_string())
            }
            ValidationErrorKind::Type { .. } => (DiagnosticKind::WrongType, error.to_string()),
            ValidationErrorKind::Required { .. } => {
                (DiagnosticKind::MissingRequired, error.to_string())
            }
            ValidationErrorKind::AdditionalProperties { .. } => {
                (DiagnosticKind::UnexpectedProperty, error.to_string())
            }
            _ => (DiagnosticKind::Other, error.to_string()),
        };

        Self {
            pointer: error.instance_path.to_string(),
            kind,
            severity: Severity::Warning,
            message,
        }
    }
}

fn allowed_values_message(options: &Value) -> String {
    let values = match options {
        Value::Array(values) => values
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    };
    format!("Value should be one of: {values}")
}

/// Check a parsed document against a schema
///
/// Diagnostics are ordered by pointer; violations at the same pointer keep
/// the schema's keyword order.
pub fn check_document(schema: &SchemaDocument, instance: &Value) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = match schema.validator().validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|e| Diagnostic::from_validation_error(&e)).collect(),
    };
    diagnostics.sort_by(|a, b| a.pointer.cmp(&b.pointer));
    diagnostics
}

// =============================================================================
// Annotators
// =============================================================================

/// Consumer of schema mappings that emits diagnostics for document content
pub trait Annotator: Send + Sync {
    fn annotate(
        &self,
        session: &SessionId,
        identifier: &DynamicResourceIdentifier,
        content: &str,
    ) -> Result<Vec<Diagnostic>>;
}

/// Annotates documents that have a schema mapping; unmapped documents get none
#[derive(Debug, Clone)]
pub struct SchemaComplianceInspection {
    mappings: Arc<SchemaMappingRegistry>,
}

impl SchemaComplianceInspection {
    pub fn new(mappings: Arc<SchemaMappingRegistry>) -> Self {
        Self { mappings }
    }
}

impl Annotator for SchemaComplianceInspection {
    fn annotate(
        &self,
        session: &SessionId,
        identifier: &DynamicResourceIdentifier,
        content: &str,
    ) -> Result<Vec<Diagnostic>> {
        let Some(schema) = self.mappings.get_mapping(session, identifier) else {
            debug!(session = %session, resource = %identifier, "no schema mapping, skipping");
            return Ok(Vec::new());
        };

        let instance: Value = serde_json::from_str(content)
            .map_err(|e| SchemaError::InvalidDocument(e.to_string()))?;

        let diagnostics = check_document(&schema, &instance);
        debug!(
            resource = %identifier,
            schema_id = %schema.id(),
            violations = diagnostics.len(),
            "document inspected"
        );
        Ok(diagnostics)
    }
}
