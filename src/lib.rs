//! Dynamic Resource Schemas
//!
//! Associates open "dynamic resource" documents (cloud resources whose
//! configuration shape is described by a registry schema, such as
//! `AWS::Log::LogGroup`) with the JSON Schema that validates them, and turns
//! schema violations into diagnostics a host editor can show inline.
//!
//! ## Features
//!
//! - **Resource Type Registry**: Fully-qualified type names resolve to schema ids
//! - **Caching Loader**: Each schema is fetched once, concurrent requests share the fetch
//! - **Negative Caching**: Schemas that fail to parse are not fetched again
//! - **Session Mappings**: Open documents map to schemas per editing session
//! - **Compliance Inspection**: Violations become diagnostics with JSON pointers
//!
//! ## Architecture
//!
//! ```text
//! DynamicResourceIdentifier
//!   └─► ResourceTypeRegistry ─► SchemaId
//!         └─► SchemaLoader ◄─ SchemaSource (directory, bundled catalog)
//!               └─► SchemaMappingRegistry (session × identifier)
//!                     └─► SchemaComplianceInspection ─► Vec<Diagnostic>
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod inspection;
pub mod loader;
pub mod mapping;
pub mod registry;
pub mod resource;
pub mod schema;
pub mod service;
pub mod source;

pub use checksum::Checksum;
pub use config::{LoaderConfig, ResourceTypesConfig, SchemaOverride, ServiceConfig};
pub use error::{Result, SchemaError};
pub use inspection::{
    check_document, Annotator, Diagnostic, DiagnosticKind, SchemaComplianceInspection, Severity,
};
pub use loader::{LoaderStats, SchemaLoader};
pub use mapping::{SchemaMapping, SchemaMappingRegistry};
pub use registry::ResourceTypeRegistry;
pub use resource::{ConnectionSettings, DynamicResourceIdentifier, ResourceType, SessionId};
pub use schema::{PropertyConstraints, SchemaDocument, SchemaId};
pub use service::SchemaMappingService;
pub use source::{BundledCatalog, ChainedSource, DirectorySource, SchemaNotFound, SchemaSource};
