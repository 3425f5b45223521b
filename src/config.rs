//! Configuration for the schema mapping service
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (resource-schemas.toml)
//! - Environment variables (RESOURCE_SCHEMAS__*)
//!
//! ## Example config file (resource-schemas.toml):
//! ```toml
//! [loader]
//! fetch_timeout_ms = 5000
//! schema_dir = "./cfn-schemas"
//! use_bundled = true
//!
//! [resource_types]
//! extra = ["AWS::SQS::Queue"]
//!
//! [[resource_types.overrides]]
//! type_name = "AWS::Log::LogGroup"
//! schema_id = "aws-logs-loggroup"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the schema mapping service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Schema loader settings
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Resource type catalog settings
    #[serde(default)]
    pub resource_types: ResourceTypesConfig,
}

/// Schema loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Upper bound on a single schema fetch
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Directory of `<schema-id>.json` files consulted before the bundled catalog
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,

    /// Whether the schemas compiled into the crate are used
    #[serde(default = "default_true")]
    pub use_bundled: bool,
}

/// Resource type catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceTypesConfig {
    /// Extra resource types registered under their default schema id
    #[serde(default)]
    pub extra: Vec<String>,

    /// Resource types whose schema id differs from the default
    #[serde(default)]
    pub overrides: Vec<SchemaOverride>,
}

/// Explicit schema id for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOverride {
    pub type_name: String,
    pub schema_id: String,
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            schema_dir: None,
            use_bundled: true,
        }
    }
}

impl LoaderConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl ServiceConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "resource-schemas.toml",
            ".resource-schemas.toml",
            "config/resource-schemas.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "resource-schemas") {
            let xdg_config = config_dir.config_dir().join("resource-schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RESOURCE_SCHEMAS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
