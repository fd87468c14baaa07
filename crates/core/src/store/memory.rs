//! In-memory object store.

use std::collections::HashMap;

use super::ObjectStore;
use crate::errors::StoreError;
use crate::objects::Object;

/// Object store backed by a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct MemoryObjectStore {
    objects: HashMap<String, Object>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored objects, labels included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.objects.contains_key(id))
    }

    fn fetch(&self, id: &str) -> Result<Option<Object>, StoreError> {
        Ok(self.objects.get(id).cloned())
    }

    fn store(&mut self, id: &str, object: &Object) -> Result<(), StoreError> {
        self.objects.insert(id.to_string(), object.clone());
        Ok(())
    }
}
