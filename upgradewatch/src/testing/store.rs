//! A store that replays scripted snapshots.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::core::{CollectionRef, ObjectRef, TrackedObject};
use crate::errors::StoreError;
use crate::store::ObjectStore;

/// A sequence of responses. Each read takes the next one; the last repeats.
#[derive(Debug)]
struct Script<T> {
    steps: VecDeque<T>,
    reads: usize,
}

impl<T: Clone> Script<T> {
    fn new(steps: Vec<T>) -> Self {
        Self {
            steps: steps.into(),
            reads: 0,
        }
    }

    fn next(&mut self) -> Option<T> {
        self.reads += 1;
        if self.steps.len() > 1 {
            self.steps.pop_front()
        } else {
            self.steps.front().cloned()
        }
    }
}

/// An [`ObjectStore`] whose answers are scripted per object and collection.
///
/// Every `get` of an object returns its next scripted snapshot, and every
/// `list` of a collection returns its next scripted listing. When a script
/// runs out, its last entry repeats. Created objects are recorded and given a
/// deterministic name (`prefix` + creation number) when they only carry a
/// `generate_name`.
#[derive(Debug, Default)]
pub struct ScriptedObjectStore {
    objects: Mutex<HashMap<ObjectRef, Script<TrackedObject>>>,
    collections: Mutex<HashMap<CollectionRef, Script<Vec<TrackedObject>>>>,
    created: Mutex<Vec<TrackedObject>>,
    create_failure: Mutex<Option<String>>,
}

impl ScriptedObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the snapshots returned for the object the snapshots describe.
    ///
    /// # Panics
    ///
    /// Panics if `snapshots` is empty.
    #[allow(clippy::expect_used)]
    pub fn script_object(&self, snapshots: Vec<TrackedObject>) {
        let target = snapshots
            .first()
            .map(TrackedObject::object_ref)
            .expect("script_object needs at least one snapshot");
        self.objects.lock().insert(target, Script::new(snapshots));
    }

    /// Scripts the listings returned for `collection`.
    pub fn script_collection(&self, collection: &CollectionRef, listings: Vec<Vec<TrackedObject>>) {
        self.collections
            .lock()
            .insert(collection.clone(), Script::new(listings));
    }

    /// Makes every later `create` fail with a backend error.
    pub fn fail_creates(&self, message: impl Into<String>) {
        *self.create_failure.lock() = Some(message.into());
    }

    /// Number of `get` calls made for `target`.
    #[must_use]
    pub fn get_calls(&self, target: &ObjectRef) -> usize {
        self.objects.lock().get(target).map_or(0, |s| s.reads)
    }

    /// Number of `list` calls made for `collection`.
    #[must_use]
    pub fn list_calls(&self, collection: &CollectionRef) -> usize {
        self.collections.lock().get(collection).map_or(0, |s| s.reads)
    }

    /// Objects created so far, as stored.
    #[must_use]
    pub fn created(&self) -> Vec<TrackedObject> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for ScriptedObjectStore {
    async fn get(&self, target: &ObjectRef) -> Result<TrackedObject, StoreError> {
        self.objects
            .lock()
            .get_mut(target)
            .and_then(Script::next)
            .ok_or_else(|| StoreError::NotFound(target.clone()))
    }

    async fn list(&self, collection: &CollectionRef) -> Result<Vec<TrackedObject>, StoreError> {
        Ok(self
            .collections
            .lock()
            .get_mut(collection)
            .and_then(Script::next)
            .unwrap_or_default())
    }

    async fn create(&self, mut object: TrackedObject) -> Result<TrackedObject, StoreError> {
        if let Some(message) = self.create_failure.lock().clone() {
            return Err(StoreError::Backend(anyhow::anyhow!(message)));
        }

        let mut created = self.created.lock();
        if object.name.is_empty() {
            let prefix = object.generate_name.clone().unwrap_or_default();
            object.name = format!("{prefix}{}", created.len() + 1);
        }
        if created.iter().any(|o| o.object_ref() == object.object_ref()) {
            return Err(StoreError::AlreadyExists(object.object_ref()));
        }
        created.push(object.clone());
        Ok(object)
    }
}
