//! File contents.

use serde::{Deserialize, Serialize};

use super::{check_id, ContentAddressed, ObjectId, ObjectType};
use crate::errors::ObjectError;

/// Raw text of one file. Leaf of the object graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    id: ObjectId,
    content: String,
}

/// Stored shape of a blob; converted back through the checked constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobRecord {
    pub id: ObjectId,
    pub content: String,
}

impl Blob {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let id = super::hash_object(ObjectType::Blob, content.as_bytes());
        Self { id, content }
    }

    /// Rebuild a blob whose id is already known, verifying it.
    pub fn with_id(id: impl Into<ObjectId>, content: impl Into<String>) -> Result<Self, ObjectError> {
        let id = id.into();
        let blob = Self::new(content);
        check_id(ObjectType::Blob, &id, &blob.id)?;
        Ok(blob)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl ContentAddressed for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        self.content.as_bytes().to_vec()
    }
}

impl TryFrom<BlobRecord> for Blob {
    type Error = ObjectError;

    fn try_from(record: BlobRecord) -> Result<Self, Self::Error> {
        Self::with_id(record.id, record.content)
    }
}

impl From<&Blob> for BlobRecord {
    fn from(blob: &Blob) -> Self {
        Self {
            id: blob.id.clone(),
            content: blob.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_content_same_id() {
        assert_eq!(Blob::new("a\nb\n").id(), Blob::new("a\nb\n").id());
        assert_ne!(Blob::new("a\n").id(), Blob::new("b\n").id());
    }

    #[test]
    fn test_compute_id_matches_constructor() {
        let blob = Blob::new("hello\n");
        assert_eq!(blob.compute_id(), blob.id());
    }

    #[test]
    fn test_with_id_accepts_matching_id() {
        let id = Blob::new("x").id().to_string();
        let blob = Blob::with_id(id.clone(), "x").unwrap();
        assert_eq!(blob.id(), id);
    }

    #[test]
    fn test_with_id_rejects_mismatch() {
        let id = Blob::new("x").id().to_string();
        let err = Blob::with_id(id, "y").unwrap_err();
        assert!(matches!(err, ObjectError::InvalidObject { ref object_type, .. } if object_type == "blob"));
    }
}
