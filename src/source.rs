//! Schema content sources
//!
//! The loader asks a [`SchemaSource`] for the raw text of a schema. Sources
//! report transport problems as opaque `anyhow` errors; a missing schema is
//! reported as [`SchemaNotFound`] so that [`ChainedSource`] can fall through
//! to the next source.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use include_dir::{include_dir, Dir};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::resource::ResourceType;
use crate::schema::SchemaId;

static BUNDLED_SCHEMAS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

/// The requested schema does not exist in a source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("schema {schema_id} not found in {source_name}")]
pub struct SchemaNotFound {
    pub schema_id: String,
    pub source_name: String,
}

/// Where schema text comes from
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Short name used in log lines and error messages
    fn name(&self) -> &str;

    /// Fetch the raw schema text for `id`
    async fn fetch(&self, id: &SchemaId) -> anyhow::Result<String>;
}

fn not_found(id: &SchemaId, source_name: &str) -> anyhow::Error {
    SchemaNotFound {
        schema_id: id.to_string(),
        source_name: source_name.to_string(),
    }
    .into()
}

// =============================================================================
// Bundled catalog
// =============================================================================

/// Schemas compiled into the crate from the `schemas/` directory
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCatalog;

impl BundledCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Ids of every bundled schema, sorted
    pub fn schema_ids(&self) -> Vec<SchemaId> {
        let mut ids: Vec<SchemaId> = BUNDLED_SCHEMAS
            .files()
            .filter_map(|file| schema_id_from_path(file.path()))
            .collect();
        ids.sort();
        ids
    }

    /// Resource types declared by the bundled schemas' `typeName`
    pub fn resource_types(&self) -> Vec<(ResourceType, SchemaId)> {
        let mut types = Vec::new();
        for file in BUNDLED_SCHEMAS.files() {
            let Some(id) = schema_id_from_path(file.path()) else {
                continue;
            };
            let declared = file
                .contents_utf8()
                .and_then(|text| serde_json::from_str::<serde_json::Value>(text).ok())
                .and_then(|json| json.get("typeName")?.as_str().map(String::from));
            match declared.as_deref().map(ResourceType::parse) {
                Some(Ok(resource_type)) => types.push((resource_type, id)),
                Some(Err(e)) => warn!(schema_id = %id, error = %e, "bundled schema has invalid typeName"),
                None => debug!(schema_id = %id, "bundled schema declares no typeName"),
            }
        }
        types.sort();
        types
    }
}

#[async_trait]
impl SchemaSource for BundledCatalog {
    fn name(&self) -> &str {
        "bundled"
    }

    async fn fetch(&self, id: &SchemaId) -> anyhow::Result<String> {
        let file = BUNDLED_SCHEMAS
            .get_file(id.filename())
            .ok_or_else(|| not_found(id, self.name()))?;
        let text = file
            .contents_utf8()
            .with_context(|| format!("bundled schema {id} is not UTF-8"))?;
        Ok(text.to_string())
    }
}

// =============================================================================
// Directory source
// =============================================================================

/// A directory of `<schema-id>.json` files
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    name: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = format!("directory {}", root.display());
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids of every schema file directly under the root, sorted
    pub fn schema_ids(&self) -> Vec<SchemaId> {
        let mut ids: Vec<SchemaId> = WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| schema_id_from_path(e.path()))
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl SchemaSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, id: &SchemaId) -> anyhow::Result<String> {
        // Ids are file stems; anything that could leave the root is treated as absent.
        if id.as_str().is_empty() || id.as_str().contains(['/', '\\']) || id.as_str().contains("..") {
            return Err(not_found(id, self.name()));
        }

        let path = self.root.join(id.filename());
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(id, self.name())),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

// =============================================================================
// Chained source
// =============================================================================

/// Tries each source in order until one has the schema
///
/// Only [`SchemaNotFound`] falls through; any other error stops the chain so
/// that a broken directory is reported instead of silently shadowed. When no
/// source has the schema, the last source's [`SchemaNotFound`] is returned.
pub struct ChainedSource {
    sources: Vec<Box<dyn SchemaSource>>,
}

impl ChainedSource {
    pub fn new(sources: Vec<Box<dyn SchemaSource>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl SchemaSource for ChainedSource {
    fn name(&self) -> &str {
        "chain"
    }

    async fn fetch(&self, id: &SchemaId) -> anyhow::Result<String> {
        let mut last_miss = None;
        for source in &self.sources {
            match source.fetch(id).await {
                Ok(text) => {
                    debug!(schema_id = %id, source = source.name(), "schema found");
                    return Ok(text);
                }
                Err(e) if e.downcast_ref::<SchemaNotFound>().is_some() => {
                    debug!(schema_id = %id, source = source.name(), "schema not in source");
                    last_miss = Some(e);
                }
                Err(e) => return Err(e.context(format!("source {} failed", source.name()))),
            }
        }
        Err(last_miss.unwrap_or_else(|| not_found(id, self.name())))
    }
}

fn schema_id_from_path(path: &Path) -> Option<SchemaId> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str().map(SchemaId::from)
}
