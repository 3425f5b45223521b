//! Error types for schema resolution, loading and annotation

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema mapping errors
///
/// Cloneable so that a single fetch outcome can be handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("No schema mapping configured for resource type {type_name}")]
    UnknownResourceType { type_name: String },

    #[error("Invalid resource type name: {0}")]
    InvalidResourceType(String),

    #[error("Schema {schema_id} unavailable: {reason}")]
    SchemaUnavailable { schema_id: String, reason: String },

    #[error("Schema {schema_id} could not be parsed: {reason}")]
    SchemaParse { schema_id: String, reason: String },

    #[error("Invalid document content: {0}")]
    InvalidDocument(String),
}

impl SchemaError {
    /// Whether a later attempt may succeed without any change to the schema content
    pub fn is_transient(&self) -> bool {
        matches!(self, SchemaError::SchemaUnavailable { .. })
    }
}
