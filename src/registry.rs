//! Resource Type Registry
//!
//! Maps fully-qualified resource type names to the schema that describes them.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::config::ResourceTypesConfig;
use crate::error::{Result, SchemaError};
use crate::resource::ResourceType;
use crate::schema::SchemaId;

#[derive(Debug, Clone)]
struct RegisteredType {
    resource_type: ResourceType,
    schema_id: SchemaId,
}

/// Lookup table from resource type full name to [`SchemaId`]
#[derive(Debug, Default)]
pub struct ResourceTypeRegistry {
    types: RwLock<BTreeMap<String, RegisteredType>>,
}

impl ResourceTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the given types under their default ids
    pub fn from_types(types: impl IntoIterator<Item = ResourceType>) -> Self {
        let registry = Self::new();
        for resource_type in types {
            registry.register(resource_type);
        }
        registry
    }

    /// Register the configured extra types and id overrides
    ///
    /// Overrides win over defaults; an override for a type not listed in
    /// `extra` registers that type as well.
    pub fn extend_from_config(&self, config: &ResourceTypesConfig) -> Result<()> {
        for name in &config.extra {
            self.register(ResourceType::parse(name)?);
        }
        for entry in &config.overrides {
            self.register_with_id(
                ResourceType::parse(&entry.type_name)?,
                SchemaId::new(entry.schema_id.clone()),
            );
        }
        Ok(())
    }

    /// Register a type under its default schema id
    pub fn register(&self, resource_type: ResourceType) {
        let schema_id = SchemaId::for_resource_type(&resource_type);
        self.register_with_id(resource_type, schema_id);
    }

    /// Register a type under an explicit schema id, replacing any previous entry
    pub fn register_with_id(&self, resource_type: ResourceType, schema_id: SchemaId) {
        debug!(resource_type = %resource_type, schema_id = %schema_id, "registering resource type");
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        types.insert(
            resource_type.full_name().to_string(),
            RegisteredType { resource_type, schema_id },
        );
    }

    /// Resolve the schema id for a resource type
    pub fn resolve_schema_id(&self, resource_type: &ResourceType) -> Result<SchemaId> {
        self.resolve_type_name(resource_type.full_name())
    }

    /// Resolve the schema id for a full type name such as `AWS::Log::LogGroup`
    pub fn resolve_type_name(&self, full_name: &str) -> Result<SchemaId> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types
            .get(full_name)
            .map(|entry| entry.schema_id.clone())
            .ok_or_else(|| SchemaError::UnknownResourceType {
                type_name: full_name.to_string(),
            })
    }

    pub fn contains(&self, full_name: &str) -> bool {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.types.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered types, sorted by full name
    pub fn resource_types(&self) -> Vec<ResourceType> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.values().map(|entry| entry.resource_type.clone()).collect()
    }
}
