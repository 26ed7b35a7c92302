//! In-memory object store.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use tracing::debug;

use super::ObjectStore;
use crate::core::{CollectionRef, Condition, ObjectRef, TrackedObject};
use crate::errors::StoreError;

/// Characters the control plane uses for generated name suffixes.
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Length of generated name suffixes.
const SUFFIX_LEN: usize = 5;

/// An object store held in memory.
///
/// Useful for local dry runs and for driving workflows in tests: the test
/// side mutates conditions while a run polls the same store.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<ObjectRef, TrackedObject>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an object.
    pub fn upsert(&self, object: TrackedObject) {
        self.objects.insert(object.object_ref(), object);
    }

    /// Sets a condition on a stored object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the object does not exist.
    pub fn set_condition(
        &self,
        target: &ObjectRef,
        condition: Condition,
    ) -> Result<(), StoreError> {
        let mut object = self
            .objects
            .get_mut(target)
            .ok_or_else(|| StoreError::NotFound(target.clone()))?;
        object.set_condition(condition);
        Ok(())
    }

    /// Removes an object, returning it if it existed.
    pub fn remove(&self, target: &ObjectRef) -> Option<TrackedObject> {
        self.objects.remove(target).map(|(_, object)| object)
    }

    /// Returns every stored object of `kind`, sorted by namespace and name.
    #[must_use]
    pub fn objects_of_kind(&self, kind: &str) -> Vec<TrackedObject> {
        let mut found: Vec<TrackedObject> = self
            .objects
            .iter()
            .filter(|entry| entry.key().kind == kind)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.object_ref().cmp(&b.object_ref()));
        found
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn generate_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, target: &ObjectRef) -> Result<TrackedObject, StoreError> {
        self.objects
            .get(target)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(target.clone()))
    }

    async fn list(&self, collection: &CollectionRef) -> Result<Vec<TrackedObject>, StoreError> {
        let mut members: Vec<TrackedObject> = self
            .objects
            .iter()
            .filter(|entry| collection.contains(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn create(&self, mut object: TrackedObject) -> Result<TrackedObject, StoreError> {
        if object.kind.is_empty() || object.namespace.is_empty() {
            return Err(StoreError::Invalid(
                "kind and namespace are required".to_string(),
            ));
        }
        if object.name.is_empty() {
            let prefix = object.generate_name.as_deref().ok_or_else(|| {
                StoreError::Invalid("either name or generate_name is required".to_string())
            })?;
            object.name = format!("{prefix}{}", generate_suffix());
        }

        match self.objects.entry(object.object_ref()) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(object = %object.object_ref(), "Stored object");
                entry.insert(object.clone());
                Ok(object)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store
            .get(&ObjectRef::new("Upgrade", "harvester-system", "nope"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_generates_name() {
        let store = InMemoryObjectStore::new();
        let created = store
            .create(TrackedObject::generated("Upgrade", "harvester-system", "hvst-upgrade-"))
            .await
            .unwrap();

        assert!(created.name.starts_with("hvst-upgrade-"));
        assert_eq!(created.name.len(), "hvst-upgrade-".len() + SUFFIX_LEN);
        assert_eq!(store.get(&created.object_ref()).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_nameless() {
        let store = InMemoryObjectStore::new();
        let version = TrackedObject::new("Version", "harvester-system", "v8.8.8");
        store.create(version.clone()).await.unwrap();

        let err = store.create(version).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let err = store
            .create(TrackedObject::new("Version", "harvester-system", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let store = InMemoryObjectStore::new();
        store.upsert(TrackedObject::new("ManagedChart", "fleet-local", "rancher-monitoring"));
        store.upsert(TrackedObject::new("ManagedChart", "fleet-local", "harvester"));
        store.upsert(TrackedObject::new("ManagedChart", "default", "other"));
        store.upsert(TrackedObject::new("Upgrade", "fleet-local", "u"));

        let names: Vec<String> = store
            .list(&CollectionRef::new("ManagedChart", "fleet-local"))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, vec!["harvester", "rancher-monitoring"]);
        assert_eq!(store.objects_of_kind("ManagedChart").len(), 3);
    }

    #[tokio::test]
    async fn test_set_condition() {
        let store = InMemoryObjectStore::new();
        let img = TrackedObject::new("VirtualMachineImage", "harvester-system", "img-1");
        store.upsert(img.clone());

        store
            .set_condition(&img.object_ref(), Condition::truthy("Imported"))
            .unwrap();
        let fetched = store.get(&img.object_ref()).await.unwrap();
        assert!(fetched.conditions[0].is_true());

        assert!(store
            .set_condition(&ObjectRef::new("X", "y", "z"), Condition::truthy("Imported"))
            .is_err());
        assert!(store.remove(&img.object_ref()).is_some());
        assert!(store.is_empty());
    }
}
