use super::{ResponseQuery, ResponseRecord, ResponseStore, Service, ServiceStore};
use crate::error::StoreError;
use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory implementation of ServiceStore
///
/// `(name, version)` is unique across owners; the check and the insert
/// happen under one write lock.
#[derive(Default)]
pub struct InMemoryServiceStore {
    services: RwLock<HashMap<Uuid, Arc<Service>>>,
}

impl InMemoryServiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: Uuid, apply: F) -> Option<Arc<Service>>
    where
        F: FnOnce(&mut Service),
    {
        let mut services = self.services.write();
        let current = services.get(&id)?;
        let mut updated = Service::clone(current);
        apply(&mut updated);
        let updated = Arc::new(updated);
        services.insert(id, Arc::clone(&updated));
        Some(updated)
    }
}

impl ServiceStore for InMemoryServiceStore {
    fn find_service_by_identity(
        &self,
        owner: Option<&str>,
        name: &str,
        version: &str,
    ) -> Result<Option<Arc<Service>>> {
        let services = self.services.read();
        Ok(services
            .values()
            .filter(|s| s.name == name && s.version == version)
            .filter(|s| owner.map_or(true, |o| s.owner == o))
            .min_by_key(|s| s.created_at)
            .cloned())
    }

    fn insert_service(&self, service: Service) -> Result<Arc<Service>> {
        let mut services = self.services.write();
        if services
            .values()
            .any(|s| s.name == service.name && s.version == service.version)
        {
            return Err(StoreError::DuplicateService {
                name: service.name,
                version: service.version,
            }
            .into());
        }
        let service = Arc::new(service);
        services.insert(service.id, Arc::clone(&service));
        Ok(service)
    }

    fn delete_service(&self, id: Uuid) -> Result<Option<Arc<Service>>> {
        Ok(self.services.write().remove(&id))
    }

    fn list_services_for_user(&self, user_id: &str) -> Result<Vec<Arc<Service>>> {
        let services = self.services.read();
        let mut visible: Vec<Arc<Service>> = services
            .values()
            .filter(|s| s.is_owner(user_id) || s.is_collaborator(user_id))
            .cloned()
            .collect();
        visible.sort_by_key(|s| s.created_at);
        Ok(visible)
    }

    fn add_collaborator(&self, id: Uuid, user_id: &str) -> Result<Option<Arc<Service>>> {
        Ok(self.update(id, |service| {
            if !service.is_collaborator(user_id) && !service.is_owner(user_id) {
                service.collaborators.push(user_id.to_string());
            }
        }))
    }

    fn remove_collaborator(&self, id: Uuid, user_id: &str) -> Result<Option<Arc<Service>>> {
        Ok(self.update(id, |service| {
            service.collaborators.retain(|c| c != user_id);
        }))
    }
}

/// In-memory implementation of ResponseStore
///
/// Records are grouped per service; insertion order is kept so that
/// `find_one` returns the first stored match.
#[derive(Default)]
pub struct InMemoryResponseStore {
    records: RwLock<HashMap<Uuid, Vec<ResponseRecord>>>,
}

impl InMemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseStore for InMemoryResponseStore {
    fn persist_responses(&self, records: Vec<ResponseRecord>) -> Result<usize> {
        let count = records.len();
        let mut store = self.records.write();
        for record in records {
            store.entry(record.service_id).or_default().push(record);
        }
        Ok(count)
    }

    fn find_one(&self, query: &ResponseQuery) -> Result<Option<ResponseRecord>> {
        let store = self.records.read();
        Ok(store
            .get(&query.service_id)
            .and_then(|records| records.iter().find(|r| query.matches(r)))
            .cloned())
    }

    fn find_by_endpoint(
        &self,
        service_id: Uuid,
        path: &str,
        method: &str,
    ) -> Result<Vec<ResponseRecord>> {
        let store = self.records.read();
        Ok(store
            .get(&service_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.path == path && r.method.eq_ignore_ascii_case(method))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_by_service(&self, service_id: Uuid) -> Result<Vec<ResponseRecord>> {
        Ok(self
            .records
            .read()
            .get(&service_id)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_by_service(&self, service_id: Uuid) -> Result<usize> {
        Ok(self
            .records
            .write()
            .remove(&service_id)
            .map(|records| records.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service(owner: &str, name: &str, version: &str) -> Service {
        Service::from_document(
            json!({"info": {"title": name, "version": version}}),
            owner,
        )
        .unwrap()
    }

    #[test]
    fn test_service_identity_lookup() {
        let store = InMemoryServiceStore::new();
        let stored = store.insert_service(service("alice", "Petstore", "1.0")).unwrap();

        let found = store
            .find_service_by_identity(Some("alice"), "Petstore", "1.0")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, stored.id);

        assert!(store
            .find_service_by_identity(Some("bob"), "Petstore", "1.0")
            .unwrap()
            .is_none());
        assert!(store
            .find_service_by_identity(None, "Petstore", "1.0")
            .unwrap()
            .is_some());
        assert!(store
            .find_service_by_identity(Some("alice"), "Petstore", "2.0")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let store = InMemoryServiceStore::new();
        store.insert_service(service("alice", "Petstore", "1.0")).unwrap();
        let err = store
            .insert_service(service("alice", "Petstore", "1.0"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::DuplicateService { .. })
        ));

        // Name and version are unique across owners
        assert!(store.insert_service(service("bob", "Petstore", "1.0")).is_err());
        assert!(store.insert_service(service("bob", "Petstore", "1.1")).is_ok());
    }

    #[test]
    fn test_concurrent_inserts_admit_one() {
        let store = Arc::new(InMemoryServiceStore::new());
        let handles: Vec<_> = ["alice", "bob", "carol", "dave"]
            .into_iter()
            .map(|owner| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.insert_service(service(owner, "Petstore", "1.0"))
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(inserted, 1);
        let visible: usize = ["alice", "bob", "carol", "dave"]
            .iter()
            .map(|owner| store.list_services_for_user(owner).unwrap().len())
            .sum();
        assert_eq!(visible, 1);
    }

    #[test]
    fn test_collaborators() {
        let store = InMemoryServiceStore::new();
        let stored = store.insert_service(service("alice", "Petstore", "1.0")).unwrap();

        let updated = store.add_collaborator(stored.id, "bob").unwrap().unwrap();
        assert!(updated.is_collaborator("bob"));
        // Adding twice keeps one entry
        let updated = store.add_collaborator(stored.id, "bob").unwrap().unwrap();
        assert_eq!(updated.collaborators, vec!["bob".to_string()]);

        assert_eq!(store.list_services_for_user("bob").unwrap().len(), 1);
        assert_eq!(store.list_services_for_user("carol").unwrap().len(), 0);

        let updated = store.remove_collaborator(stored.id, "bob").unwrap().unwrap();
        assert!(updated.collaborators.is_empty());

        assert!(store.add_collaborator(Uuid::new_v4(), "bob").unwrap().is_none());
    }

    #[test]
    fn test_response_store_queries() {
        let store = InMemoryResponseStore::new();
        let service_id = Uuid::new_v4();
        let other_service = Uuid::new_v4();

        store
            .persist_responses(vec![
                ResponseRecord::new(service_id, "/pets", "get", 200, json!([1]), Some("default".into())),
                ResponseRecord::new(service_id, "/pets", "get", 500, json!({}), None),
                ResponseRecord::new(service_id, "/pets", "post", 201, json!({}), None),
                ResponseRecord::new(other_service, "/pets", "get", 200, json!([2]), None),
            ])
            .unwrap();
        assert_eq!(store.len(), 4);

        let found = store
            .find_one(&ResponseQuery {
                service_id,
                path: "/pets".into(),
                method: "GET".into(),
                status_code: Some(500),
                example_name: None,
            })
            .unwrap()
            .unwrap();
        assert_eq!(found.status_code, 500);

        assert_eq!(store.find_by_endpoint(service_id, "/pets", "get").unwrap().len(), 2);
        assert_eq!(store.find_by_service(service_id).unwrap().len(), 3);

        assert_eq!(store.delete_by_service(service_id).unwrap(), 3);
        assert!(store.find_by_service(service_id).unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }
}
