//! Schema identifiers and parsed schema documents

use chrono::{DateTime, Utc};
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::resource::ResourceType;

/// Logical identifier of a resource schema (e.g. `aws-log-loggroup`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(String);

impl SchemaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Default id for a resource type, following the registry file naming:
    /// `AWS::Log::LogGroup` -> `aws-log-loggroup`
    pub fn for_resource_type(resource_type: &ResourceType) -> Self {
        Self(resource_type.full_name().to_lowercase().replace("::", "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this schema inside a catalog directory
    pub fn filename(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Allowed values and bounds declared for a single property
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyConstraints {
    /// `enum` values, in declaration order
    pub enum_values: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// Declared JSON type (`"integer"`, `"string"`, ...)
    pub json_type: Option<String>,
}

impl PropertyConstraints {
    fn from_property(property: &Value) -> Self {
        Self {
            enum_values: property.get("enum").and_then(Value::as_array).cloned(),
            minimum: property.get("minimum").and_then(Value::as_f64),
            maximum: property.get("maximum").and_then(Value::as_f64),
            json_type: property
                .get("type")
                .and_then(Value::as_str)
                .map(String::from),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.enum_values.is_none() && self.minimum.is_none() && self.maximum.is_none()
    }
}

/// A fetched, parsed and compiled resource schema
///
/// Shared read-only between the loader cache and every mapping that uses it.
pub struct SchemaDocument {
    id: SchemaId,
    content: Value,
    checksum: Checksum,
    fetched_at: DateTime<Utc>,
    validator: JSONSchema,
}

impl SchemaDocument {
    /// Parse raw schema text into a compiled document
    ///
    /// Fails with [`SchemaError::SchemaParse`] when the text is not JSON, not a
    /// JSON object, or not a valid JSON Schema.
    pub fn parse(id: SchemaId, raw: &str) -> Result<Self> {
        let content: Value = serde_json::from_str(raw).map_err(|e| SchemaError::SchemaParse {
            schema_id: id.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_value(id, content)
    }

    /// Compile an already-parsed JSON value
    pub fn from_value(id: SchemaId, content: Value) -> Result<Self> {
        if !content.is_object() {
            return Err(SchemaError::SchemaParse {
                schema_id: id.to_string(),
                reason: "schema root must be a JSON object".to_string(),
            });
        }

        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&content)
            .map_err(|e| SchemaError::SchemaParse {
                schema_id: id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            checksum: Checksum::of_json(&content),
            id,
            content,
            fetched_at: Utc::now(),
            validator,
        })
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// The `typeName` the schema declares, if any
    pub fn type_name(&self) -> Option<&str> {
        self.content.get("typeName").and_then(Value::as_str)
    }

    /// Names of the top-level properties, sorted
    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .content
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Constraints declared for a top-level property
    pub fn property_constraints(&self, name: &str) -> Option<PropertyConstraints> {
        self.content
            .get("properties")?
            .get(name)
            .map(PropertyConstraints::from_property)
    }

    pub(crate) fn validator(&self) -> &JSONSchema {
        &self.validator
    }
}

impl fmt::Debug for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDocument")
            .field("id", &self.id)
            .field("checksum", &self.checksum.short())
            .field("fetched_at", &self.fetched_at)
            .finish_non_exhaustive()
    }
}
