//! Persistence collaborators for services and generated responses.
//!
//! Both traits are synchronous; the in-memory backends never block for
//! long and a database-backed implementation can wrap a pooled blocking
//! client.

mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub use memory::{InMemoryResponseStore, InMemoryServiceStore};

/// A mocked API: an uploaded OpenAPI document plus ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub description: String,
    pub openapi: Value,
    pub owner: String,
    #[serde(default)]
    pub collaborators: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Service {
    /// Build a service from a parsed document; identity comes from `info`.
    pub fn from_document(openapi: Value, owner: impl Into<String>) -> Option<Self> {
        let info = openapi.get("info")?;
        let name = info.get("title")?.as_str()?.to_string();
        let version = match info.get("version")? {
            Value::String(v) => v.clone(),
            other => other.to_string(),
        };
        let description = info
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string();

        Some(Self {
            id: Uuid::new_v4(),
            name,
            version,
            description,
            openapi,
            owner: owner.into(),
            collaborators: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner == user_id
    }

    pub fn is_collaborator(&self, user_id: &str) -> bool {
        self.collaborators.iter().any(|c| c == user_id)
    }
}

/// One stored example for an operation and status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub id: Uuid,
    pub service_id: Uuid,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    pub content: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_name: Option<String>,
}

impl ResponseRecord {
    pub fn new(
        service_id: Uuid,
        path: impl Into<String>,
        method: &str,
        status_code: u16,
        content: Value,
        example_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_id,
            path: path.into(),
            method: method.to_ascii_lowercase(),
            status_code,
            content,
            example_name,
        }
    }
}

/// Exact-match lookup criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseQuery {
    pub service_id: Uuid,
    pub path: String,
    pub method: String,
    pub status_code: Option<u16>,
    pub example_name: Option<String>,
}

impl ResponseQuery {
    pub fn matches(&self, record: &ResponseRecord) -> bool {
        record.service_id == self.service_id
            && record.path == self.path
            && record.method.eq_ignore_ascii_case(&self.method)
            && self.status_code.map_or(true, |s| record.status_code == s)
            && self
                .example_name
                .as_deref()
                .map_or(true, |name| record.example_name.as_deref() == Some(name))
    }
}

pub trait ServiceStore: Send + Sync {
    /// Look up by identity; `owner: None` matches any owner.
    fn find_service_by_identity(
        &self,
        owner: Option<&str>,
        name: &str,
        version: &str,
    ) -> Result<Option<Arc<Service>>>;

    fn insert_service(&self, service: Service) -> Result<Arc<Service>>;

    fn delete_service(&self, id: Uuid) -> Result<Option<Arc<Service>>>;

    /// Services the user owns or collaborates on.
    fn list_services_for_user(&self, user_id: &str) -> Result<Vec<Arc<Service>>>;

    fn add_collaborator(&self, id: Uuid, user_id: &str) -> Result<Option<Arc<Service>>>;

    fn remove_collaborator(&self, id: Uuid, user_id: &str) -> Result<Option<Arc<Service>>>;
}

pub trait ResponseStore: Send + Sync {
    /// Store records; returns how many were stored.
    fn persist_responses(&self, records: Vec<ResponseRecord>) -> Result<usize>;

    /// First record matching every criterion in `query`.
    fn find_one(&self, query: &ResponseQuery) -> Result<Option<ResponseRecord>>;

    /// All records for a path and method, regardless of status or name.
    fn find_by_endpoint(
        &self,
        service_id: Uuid,
        path: &str,
        method: &str,
    ) -> Result<Vec<ResponseRecord>>;

    fn find_by_service(&self, service_id: Uuid) -> Result<Vec<ResponseRecord>>;

    /// Remove every record of a service; returns how many were removed.
    fn delete_by_service(&self, service_id: Uuid) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_from_document() {
        let service = Service::from_document(
            json!({"openapi": "3.0.0", "info": {"title": "Petstore", "version": "1.0.0"}}),
            "alice",
        )
        .unwrap();
        assert_eq!(service.name, "Petstore");
        assert_eq!(service.version, "1.0.0");
        assert_eq!(service.description, "-");
        assert!(service.is_owner("alice"));
        assert!(!service.is_collaborator("alice"));

        // Numeric versions are accepted as text
        let service =
            Service::from_document(json!({"info": {"title": "T", "version": 2}}), "bob").unwrap();
        assert_eq!(service.version, "2");

        assert!(Service::from_document(json!({"paths": {}}), "bob").is_none());
    }

    #[test]
    fn test_query_matching() {
        let service_id = Uuid::new_v4();
        let record = ResponseRecord::new(
            service_id,
            "/pets/1",
            "GET",
            404,
            json!({}),
            Some("missing".to_string()),
        );
        assert_eq!(record.method, "get");

        let mut query = ResponseQuery {
            service_id,
            path: "/pets/1".to_string(),
            method: "get".to_string(),
            status_code: None,
            example_name: None,
        };
        assert!(query.matches(&record));

        query.status_code = Some(404);
        query.example_name = Some("missing".to_string());
        assert!(query.matches(&record));

        query.status_code = Some(200);
        assert!(!query.matches(&record));

        query.status_code = None;
        query.example_name = Some("other".to_string());
        assert!(!query.matches(&record));
    }
}
