//! Object store collaborators.
//!
//! An [`ObjectStore`] maps ids to immutable objects (and label names to
//! labels). Two backends ship with the crate: [`MemoryObjectStore`] for
//! tests and embedding, and [`SqliteObjectStore`] for on-disk repositories.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryObjectStore;
pub use sqlite::SqliteObjectStore;

use crate::errors::StoreError;
use crate::objects::{Object, ObjectId};

/// Key-value persistence for objects.
///
/// Implementations do not need to be thread-safe; callers sharing a store
/// across threads must serialize access.
pub trait ObjectStore {
    /// Whether anything is stored under `id`.
    fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Load the object stored under `id`, or `None` if absent.
    fn fetch(&self, id: &str) -> Result<Option<Object>, StoreError>;

    /// Store `object` under `id`, replacing whatever was there.
    fn store(&mut self, id: &str, object: &Object) -> Result<(), StoreError>;

    /// Store `object` under its own id and return that id.
    fn put(&mut self, object: impl Into<Object>) -> Result<ObjectId, StoreError>
    where
        Self: Sized,
    {
        let object = object.into();
        let id = object.object_id().to_string();
        self.store(&id, &object)?;
        Ok(id)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        (**self).exists(id)
    }

    fn fetch(&self, id: &str) -> Result<Option<Object>, StoreError> {
        (**self).fetch(id)
    }

    fn store(&mut self, id: &str, object: &Object) -> Result<(), StoreError> {
        (**self).store(id, object)
    }
}
