//! The object store boundary.
//!
//! The engine never talks to a control plane directly. Everything it reads or
//! creates goes through [`ObjectStore`], which a harness implements on top of
//! whatever transport it uses. Calls are treated as slow remote requests and
//! are never retried here; the only retry is the poller's next tick.

mod memory;

pub use memory::InMemoryObjectStore;

use async_trait::async_trait;

use crate::core::{CollectionRef, ObjectRef, TrackedObject};
use crate::errors::StoreError;

/// Typed read/create access to a remote object store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches one object. A missing object is [`StoreError::NotFound`].
    async fn get(&self, target: &ObjectRef) -> Result<TrackedObject, StoreError>;

    /// Lists every object in a collection.
    async fn list(&self, collection: &CollectionRef) -> Result<Vec<TrackedObject>, StoreError>;

    /// Creates an object and returns it as stored, with its final name.
    async fn create(&self, object: TrackedObject) -> Result<TrackedObject, StoreError>;
}
