//! End-to-end tests: open a dynamic resource, map its schema, annotate content.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dynamic_resource_schemas::{
    Annotator, ConnectionSettings, DiagnosticKind, DynamicResourceIdentifier, ResourceType,
    SchemaError, SchemaId, SchemaMappingService, ServiceConfig, SessionId,
};
use tracing_subscriber::EnvFilter;

const RETENTION_MESSAGE: &str = "Value should be one of: 1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1827, 3653";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn log_group_identifier() -> DynamicResourceIdentifier {
    let resource_type = ResourceType::new("AWS::Log::LogGroup", "Log", "LogGroup");
    DynamicResourceIdentifier::new(
        ConnectionSettings::new("profile:default", "us-east-1"),
        resource_type.full_name(),
        "sampleIdentifier",
    )
}

fn service() -> SchemaMappingService {
    init_tracing();
    SchemaMappingService::from_config(&ServiceConfig::default()).unwrap()
}

// =============================================================================
// Schema application
// =============================================================================

#[tokio::test]
async fn test_schema_is_applied_to_log_group() {
    let service = service();
    let session = SessionId::from("project");
    let identifier = log_group_identifier();

    service.open_resource(&session, &identifier).await.unwrap();

    let content = include_str!("fixtures/log_group_invalid_retention.json");
    let diagnostics = service.annotate(&session, &identifier, content).unwrap();

    assert_eq!(diagnostics.len(), 1, "unexpected diagnostics: {diagnostics:?}");
    assert_eq!(diagnostics[0].pointer, "/RetentionInDays");
    assert_eq!(diagnostics[0].kind, DiagnosticKind::NotInAllowedSet);
    assert_eq!(diagnostics[0].message, RETENTION_MESSAGE);
}

#[tokio::test]
async fn test_allowed_value_is_not_flagged() {
    let service = service();
    let session = SessionId::from("project");
    let identifier = log_group_identifier();

    service.open_resource(&session, &identifier).await.unwrap();

    let content = include_str!("fixtures/log_group_valid.json");
    assert!(service.annotate(&session, &identifier, content).unwrap().is_empty());
}

#[tokio::test]
async fn test_removed_mapping_produces_no_annotations() {
    let service = service();
    let session = SessionId::from("project");
    let identifier = log_group_identifier();

    service.open_resource(&session, &identifier).await.unwrap();
    service.close_resource(&session, &identifier);

    assert!(service.mappings().get_mapping(&session, &identifier).is_none());
    let content = include_str!("fixtures/log_group_invalid_retention.json");
    assert!(service.annotate(&session, &identifier, content).unwrap().is_empty());
}

#[tokio::test]
async fn test_unmapped_session_produces_no_annotations() {
    let service = service();
    let identifier = log_group_identifier();

    service
        .open_resource(&SessionId::from("project-a"), &identifier)
        .await
        .unwrap();

    let content = include_str!("fixtures/log_group_invalid_retention.json");
    let diagnostics = service
        .inspection()
        .annotate(&SessionId::from("project-b"), &identifier, content)
        .unwrap();
    assert!(diagnostics.is_empty());
}

#[tokio::test]
async fn test_reopening_is_idempotent() {
    let service = service();
    let session = SessionId::from("project");
    let identifier = log_group_identifier();

    let first = service.open_resource(&session, &identifier).await.unwrap();
    let second = service.open_resource(&session, &identifier).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(service.mappings().len(), 1);
    assert_eq!(service.loader().stats().fetches, 1);
}

#[tokio::test]
async fn test_malformed_content_is_reported() {
    let service = service();
    let session = SessionId::from("project");
    let identifier = log_group_identifier();

    service.open_resource(&session, &identifier).await.unwrap();

    let err = service
        .annotate(&session, &identifier, r#"{"RetentionInDays": "#)
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidDocument(_)));
}

// =============================================================================
// Type resolution and sources
// =============================================================================

#[test]
fn test_bundled_types_resolve_deterministically() {
    let service = service();
    let types = service.resource_types();

    for resource_type in types.resource_types() {
        let first = types.resolve_schema_id(&resource_type).unwrap();
        let again = types.resolve_schema_id(&resource_type).unwrap();
        assert_eq!(first, again);
    }
    assert_eq!(
        types.resolve_type_name("AWS::Log::LogGroup").unwrap(),
        SchemaId::from("aws-log-loggroup")
    );
}

#[tokio::test]
async fn test_schema_directory_shadows_bundled_catalog() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(
        fixtures_path().join("aws-log-loggroup-short-retention.json"),
        dir.path().join("aws-log-loggroup.json"),
    )
    .unwrap();

    let mut config = ServiceConfig::default();
    config.loader.schema_dir = Some(dir.path().to_path_buf());
    let service = SchemaMappingService::from_config(&config).unwrap();

    let session = SessionId::from("project");
    let identifier = log_group_identifier();
    let document = service.open_resource(&session, &identifier).await.unwrap();

    let retention = document.property_constraints("RetentionInDays").unwrap();
    assert_eq!(retention.enum_values.map(|v| v.len()), Some(3));

    let diagnostics = service
        .annotate(&session, &identifier, r#"{"RetentionInDays": 14}"#)
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "Value should be one of: 1, 3, 5");
}

#[tokio::test]
async fn test_broken_schema_file_is_a_parse_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("aws-log-loggroup.json"), "{ \"type\": ").unwrap();

    let mut config = ServiceConfig::default();
    config.loader.schema_dir = Some(dir.path().to_path_buf());
    let service = SchemaMappingService::from_config(&config).unwrap();

    let session = SessionId::from("project");
    let identifier = log_group_identifier();

    let err = service.open_resource(&session, &identifier).await.unwrap_err();
    assert!(matches!(err, SchemaError::SchemaParse { .. }), "unexpected error {err:?}");
    assert!(service.mappings().is_empty());

    // Fixing the file does not help until the cached failure is invalidated.
    std::fs::copy(
        fixtures_path().join("aws-log-loggroup-short-retention.json"),
        dir.path().join("aws-log-loggroup.json"),
    )
    .unwrap();
    let again = service.open_resource(&session, &identifier).await.unwrap_err();
    assert_eq!(err, again);
    assert_eq!(service.loader().stats().fetches, 1);

    assert!(service.loader().invalidate(&SchemaId::from("aws-log-loggroup")));
    service.open_resource(&session, &identifier).await.unwrap();
    assert_eq!(service.loader().stats().fetches, 2);
}
