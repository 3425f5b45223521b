//! Resource identity types
//!
//! A dynamic resource is addressed by its fully-qualified type name
//! (`AWS::Log::LogGroup`), the instance identifier, and the connection it was
//! opened through. Editing sessions are keyed by [`SessionId`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Result, SchemaError};

fn type_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9]+)::([A-Za-z0-9]+)::([A-Za-z0-9]+)$")
            .expect("resource type pattern is valid")
    })
}

/// A resource type such as `AWS::Log::LogGroup`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceType {
    full_name: String,
    service_name: String,
    type_name: String,
}

impl ResourceType {
    /// Build from already-split parts
    pub fn new(
        full_name: impl Into<String>,
        service_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            service_name: service_name.into(),
            type_name: type_name.into(),
        }
    }

    /// Parse `<Namespace>::<Service>::<Type>`
    pub fn parse(full_name: &str) -> Result<Self> {
        let captures = type_name_pattern()
            .captures(full_name)
            .ok_or_else(|| SchemaError::InvalidResourceType(full_name.to_string()))?;
        Ok(Self::new(full_name, &captures[2], &captures[3]))
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl FromStr for ResourceType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Credentials and region a resource was opened through
///
/// Opaque to this crate; only used to tell apart identifiers that name the
/// same instance in different accounts or regions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub credentials_id: String,
    pub region: String,
}

impl ConnectionSettings {
    pub fn new(credentials_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            credentials_id: credentials_id.into(),
            region: region.into(),
        }
    }
}

/// Identifies one resource instance for schema purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DynamicResourceIdentifier {
    pub connection: ConnectionSettings,
    pub resource_type_name: String,
    pub instance_identifier: String,
}

impl DynamicResourceIdentifier {
    pub fn new(
        connection: ConnectionSettings,
        resource_type_name: impl Into<String>,
        instance_identifier: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            resource_type_name: resource_type_name.into(),
            instance_identifier: instance_identifier.into(),
        }
    }

    /// Parse the resource type name carried by this identifier
    pub fn resource_type(&self) -> Result<ResourceType> {
        ResourceType::parse(&self.resource_type_name)
    }
}

impl fmt::Display for DynamicResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({}@{})",
            self.resource_type_name,
            self.instance_identifier,
            self.connection.credentials_id,
            self.connection.region
        )
    }
}

/// Editing session a mapping belongs to (a project, a workspace window)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_type() {
        let parsed = ResourceType::parse("AWS::Log::LogGroup").unwrap();
        assert_eq!(parsed, ResourceType::new("AWS::Log::LogGroup", "Log", "LogGroup"));
        assert_eq!(parsed.service_name(), "Log");
        assert_eq!(parsed.type_name(), "LogGroup");
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for bad in ["AWS::Log", "AWS::Log::Log::Group", "AWS:Log:LogGroup", "", "AWS::Log::Log Group"] {
            assert_eq!(
                ResourceType::parse(bad),
                Err(SchemaError::InvalidResourceType(bad.to_string())),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_identifiers_differ_by_connection() {
        let a = DynamicResourceIdentifier::new(
            ConnectionSettings::new("profile:default", "us-east-1"),
            "AWS::Log::LogGroup",
            "sampleIdentifier",
        );
        let mut b = a.clone();
        assert_eq!(a, b);
        b.connection.region = "eu-west-1".to_string();
        assert_ne!(a, b);
        assert_eq!(a.resource_type().unwrap().full_name(), "AWS::Log::LogGroup");
    }
}
