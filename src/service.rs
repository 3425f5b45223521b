//! Schema Mapping Service
//!
//! Wires the type registry, loader and mapping registry together: opening a
//! resource resolves its schema, loads it, and records the mapping the
//! inspection reads.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::inspection::{Annotator, Diagnostic, SchemaComplianceInspection};
use crate::loader::SchemaLoader;
use crate::mapping::SchemaMappingRegistry;
use crate::registry::ResourceTypeRegistry;
use crate::resource::{DynamicResourceIdentifier, SessionId};
use crate::schema::SchemaDocument;
use crate::source::{BundledCatalog, ChainedSource, DirectorySource, SchemaSource};

/// Facade over the schema mapping components
pub struct SchemaMappingService {
    types: Arc<ResourceTypeRegistry>,
    loader: SchemaLoader,
    mappings: Arc<SchemaMappingRegistry>,
    inspection: SchemaComplianceInspection,
}

impl SchemaMappingService {
    /// Assemble a service from existing components
    pub fn new(types: Arc<ResourceTypeRegistry>, loader: SchemaLoader) -> Self {
        let mappings = Arc::new(SchemaMappingRegistry::new());
        let inspection = SchemaComplianceInspection::new(Arc::clone(&mappings));
        Self {
            types,
            loader,
            mappings,
            inspection,
        }
    }

    /// Build the service described by `config`
    ///
    /// Sources are consulted in order: the configured schema directory, then
    /// the bundled catalog. Bundled resource types are registered first so
    /// configured overrides replace them.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let mut sources: Vec<Box<dyn SchemaSource>> = Vec::new();
        if let Some(dir) = &config.loader.schema_dir {
            sources.push(Box::new(DirectorySource::new(dir)));
        }

        let types = ResourceTypeRegistry::new();
        if config.loader.use_bundled {
            let catalog = BundledCatalog::new();
            for (resource_type, schema_id) in catalog.resource_types() {
                types.register_with_id(resource_type, schema_id);
            }
            sources.push(Box::new(catalog));
        }
        types.extend_from_config(&config.resource_types)?;

        if sources.is_empty() {
            warn!("no schema sources configured; every schema load will fail");
        }
        info!(
            sources = sources.len(),
            resource_types = types.len(),
            timeout_ms = config.loader.fetch_timeout_ms,
            "schema mapping service configured"
        );

        let loader = SchemaLoader::from_shared(
            Arc::new(ChainedSource::new(sources)),
            config.loader.fetch_timeout(),
        );
        Ok(Self::new(Arc::new(types), loader))
    }

    /// Resolve, load and map the schema for a resource opened in `session`
    ///
    /// Nothing is recorded when any step fails.
    pub async fn open_resource(
        &self,
        session: &SessionId,
        identifier: &DynamicResourceIdentifier,
    ) -> Result<Arc<SchemaDocument>> {
        let schema_id = self.types.resolve_type_name(&identifier.resource_type_name)?;
        let document = self.loader.load_schema(&schema_id).await?;
        self.mappings
            .add_mapping(session, identifier.clone(), Arc::clone(&document));
        Ok(document)
    }

    /// Forget the mapping for a resource closed in `session`
    pub fn close_resource(&self, session: &SessionId, identifier: &DynamicResourceIdentifier) {
        self.mappings.remove_mapping(session, identifier);
    }

    /// End `session`, dropping all its mappings
    pub fn close_session(&self, session: &SessionId) -> usize {
        self.mappings.close_session(session)
    }

    /// Diagnostics for the current content of a resource document
    pub fn annotate(
        &self,
        session: &SessionId,
        identifier: &DynamicResourceIdentifier,
        content: &str,
    ) -> Result<Vec<Diagnostic>> {
        self.inspection.annotate(session, identifier, content)
    }

    pub fn resource_types(&self) -> &ResourceTypeRegistry {
        &self.types
    }

    pub fn loader(&self) -> &SchemaLoader {
        &self.loader
    }

    pub fn mappings(&self) -> &SchemaMappingRegistry {
        &self.mappings
    }

    /// The annotator hosts register with their editor
    pub fn inspection(&self) -> &SchemaComplianceInspection {
        &self.inspection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::resource::ConnectionSettings;
    use crate::schema::SchemaId;

    fn identifier(type_name: &str) -> DynamicResourceIdentifier {
        DynamicResourceIdentifier::new(
            ConnectionSettings::new("profile:default", "us-east-1"),
            type_name,
            "sampleIdentifier",
        )
    }

    #[tokio::test]
    async fn test_unknown_type_records_nothing() {
        let service = SchemaMappingService::from_config(&ServiceConfig::default()).unwrap();
        let session = SessionId::from("project");

        let err = service
            .open_resource(&session, &identifier("AWS::Nope::Thing"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownResourceType {
                type_name: "AWS::Nope::Thing".to_string()
            }
        );
        assert!(service.mappings().is_empty());
    }

    #[tokio::test]
    async fn test_without_sources_schema_is_unavailable() {
        let mut config = ServiceConfig::default();
        config.loader.use_bundled = false;
        config.resource_types.extra.push("AWS::Log::LogGroup".to_string());
        let service = SchemaMappingService::from_config(&config).unwrap();

        let err = service
            .open_resource(&SessionId::from("project"), &identifier("AWS::Log::LogGroup"))
            .await
            .unwrap_err();
        assert!(err.is_transient(), "unexpected error {err:?}");
        assert!(service.mappings().is_empty());
    }

    #[tokio::test]
    async fn test_close_resource_and_session() {
        let service = SchemaMappingService::from_config(&ServiceConfig::default()).unwrap();
        let session = SessionId::from("project");
        let log_group = identifier("AWS::Log::LogGroup");
        let bucket = identifier("AWS::S3::Bucket");

        service.open_resource(&session, &log_group).await.unwrap();
        service.open_resource(&session, &bucket).await.unwrap();
        assert_eq!(service.mappings().len(), 2);

        service.close_resource(&session, &log_group);
        assert!(service.mappings().get_mapping(&session, &log_group).is_none());
        assert_eq!(service.close_session(&session), 1);
        assert!(service.mappings().is_empty());

        // The schemas stay cached after the session ends.
        assert!(service.loader().is_cached(&SchemaId::from("aws-log-loggroup")));
    }
}
