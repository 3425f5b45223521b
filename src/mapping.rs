//! Schema Mapping Registry
//!
//! Records which schema applies to each open resource document. Entries are
//! scoped to an editing session; closing the session drops them all.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::resource::{DynamicResourceIdentifier, SessionId};
use crate::schema::SchemaDocument;

/// One resource document's schema within a session
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    pub session: SessionId,
    pub identifier: DynamicResourceIdentifier,
    pub document: Arc<SchemaDocument>,
}

type SessionMappings = HashMap<DynamicResourceIdentifier, Arc<SchemaDocument>>;

/// Session-scoped association from resource identifiers to schema documents
#[derive(Debug, Default)]
pub struct SchemaMappingRegistry {
    sessions: RwLock<HashMap<SessionId, SessionMappings>>,
}

impl SchemaMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `document` with `identifier` in `session`, replacing any prior mapping
    pub fn add_mapping(
        &self,
        session: &SessionId,
        identifier: DynamicResourceIdentifier,
        document: Arc<SchemaDocument>,
    ) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        info!(
            session = %session,
            resource = %identifier,
            schema_id = %document.id(),
            "schema mapping added"
        );
        sessions
            .entry(session.clone())
            .or_default()
            .insert(identifier, document);
    }

    /// The schema mapped to `identifier` in `session`
    pub fn get_mapping(
        &self,
        session: &SessionId,
        identifier: &DynamicResourceIdentifier,
    ) -> Option<Arc<SchemaDocument>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session)?.get(identifier).cloned()
    }

    /// Drop the mapping for `identifier`; a no-op when none exists
    pub fn remove_mapping(&self, session: &SessionId, identifier: &DynamicResourceIdentifier) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(mappings) = sessions.get_mut(session) else {
            return;
        };
        if mappings.remove(identifier).is_some() {
            info!(session = %session, resource = %identifier, "schema mapping removed");
        }
        if mappings.is_empty() {
            sessions.remove(session);
        }
    }

    /// End a session, dropping every mapping it holds; returns how many were dropped
    pub fn close_session(&self, session: &SessionId) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = sessions.remove(session).map(|m| m.len()).unwrap_or(0);
        debug!(session = %session, dropped, "session closed");
        dropped
    }

    /// Every mapping held by `session`
    pub fn mappings_for(&self, session: &SessionId) -> Vec<SchemaMapping> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(session)
            .map(|mappings| {
                mappings
                    .iter()
                    .map(|(identifier, document)| SchemaMapping {
                        session: session.clone(),
                        identifier: identifier.clone(),
                        document: Arc::clone(document),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total mappings across all sessions
    pub fn len(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ConnectionSettings;
    use crate::schema::SchemaId;
    use serde_json::json;

    fn identifier(instance: &str) -> DynamicResourceIdentifier {
        DynamicResourceIdentifier::new(
            ConnectionSettings::new("profile:default", "us-east-1"),
            "AWS::Log::LogGroup",
            instance,
        )
    }

    fn document(id: &str) -> Arc<SchemaDocument> {
        Arc::new(SchemaDocument::from_value(SchemaId::from(id), json!({"type": "object"})).unwrap())
    }

    #[test]
    fn test_add_get_remove() {
        let registry = SchemaMappingRegistry::new();
        let session = SessionId::from("project-a");
        let doc = document("aws-log-loggroup");

        assert!(registry.get_mapping(&session, &identifier("one")).is_none());

        registry.add_mapping(&session, identifier("one"), Arc::clone(&doc));
        let found = registry.get_mapping(&session, &identifier("one")).unwrap();
        assert!(Arc::ptr_eq(&found, &doc));

        registry.remove_mapping(&session, &identifier("one"));
        assert!(registry.get_mapping(&session, &identifier("one")).is_none());
        assert!(registry.is_empty());

        // Removing again is harmless.
        registry.remove_mapping(&session, &identifier("one"));
    }

    #[test]
    fn test_add_is_idempotent_and_replaces() {
        let registry = SchemaMappingRegistry::new();
        let session = SessionId::from("project-a");
        let doc = document("aws-log-loggroup");

        registry.add_mapping(&session, identifier("one"), Arc::clone(&doc));
        registry.add_mapping(&session, identifier("one"), Arc::clone(&doc));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.mappings_for(&session).len(), 1);

        let replacement = document("aws-log-loggroup-v2");
        registry.add_mapping(&session, identifier("one"), Arc::clone(&replacement));
        assert_eq!(registry.len(), 1);
        let found = registry.get_mapping(&session, &identifier("one")).unwrap();
        assert_eq!(found.id().as_str(), "aws-log-loggroup-v2");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let registry = SchemaMappingRegistry::new();
        let a = SessionId::from("project-a");
        let b = SessionId::from("project-b");

        registry.add_mapping(&a, identifier("one"), document("aws-log-loggroup"));
        registry.add_mapping(&a, identifier("two"), document("aws-log-loggroup"));
        registry.add_mapping(&b, identifier("one"), document("aws-log-loggroup"));

        assert!(registry.get_mapping(&b, &identifier("two")).is_none());
        assert_eq!(registry.close_session(&a), 2);
        assert!(registry.get_mapping(&a, &identifier("one")).is_none());
        assert!(registry.get_mapping(&b, &identifier("one")).is_some());
        assert_eq!(registry.close_session(&a), 0);
    }
}
