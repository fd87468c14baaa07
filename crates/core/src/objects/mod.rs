//! Content-addressed object model.
//!
//! Blobs, trees and commits are immutable and identified by the SHA-256 of
//! their canonical serialization. Labels are the one mutable type: a named
//! pointer to a commit id or to another label.
//!
//! Objects never hold live references to each other. A tree names its
//! children by id and a commit names its tree and parents by id, so every
//! traversal goes back through an [`ObjectStore`](crate::store::ObjectStore)
//! and identical subtrees are shared for free.

pub mod blob;
pub mod commit;
pub mod label;
pub mod tree;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use blob::{Blob, BlobRecord};
pub use commit::{Commit, CommitRecord};
pub use label::{Label, HEAD};
pub use tree::{Tree, TreeRecord};

use crate::errors::ObjectError;

/// Hex-encoded SHA-256 digest, or a label name for [`Label`] objects.
pub type ObjectId = String;

/// Discriminant for the four object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Label,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Label => "label",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared capability of every object variant: a canonical byte form and the
/// id derived from it.
pub trait ContentAddressed {
    /// Which variant this is.
    fn object_type(&self) -> ObjectType;

    /// Identity-bearing fields in a fixed, order-independent byte layout.
    fn canonical_bytes(&self) -> Vec<u8>;

    /// Recompute the id from the canonical form.
    fn compute_id(&self) -> ObjectId {
        hash_object(self.object_type(), &self.canonical_bytes())
    }
}

/// Hash a canonical body under a `"<type> <len>\0"` header.
pub fn hash_object(object_type: ObjectType, body: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(format!("{} {}\0", object_type, body.len()).as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Whether `s` has the shape of an object hash.
pub fn is_object_id(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Closed sum of the object variants as they travel through a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Label(Label),
}

impl Object {
    /// Key the object is stored under.
    pub fn object_id(&self) -> &str {
        match self {
            Self::Blob(b) => b.id(),
            Self::Tree(t) => t.id(),
            Self::Commit(c) => c.id(),
            Self::Label(l) => l.name(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
            Self::Label(_) => ObjectType::Label,
        }
    }

    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_tree(self) -> Option<Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_commit(self) -> Option<Commit> {
        match self {
            Self::Commit(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_label(self) -> Option<Label> {
        match self {
            Self::Label(l) => Some(l),
            _ => None,
        }
    }
}

/// Serialized form of an [`Object`]. Converting back into an `Object`
/// re-derives and checks every content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectRecord {
    Blob(BlobRecord),
    Tree(TreeRecord),
    Commit(CommitRecord),
    Label(Label),
}

impl From<&Object> for ObjectRecord {
    fn from(object: &Object) -> Self {
        match object {
            Object::Blob(b) => Self::Blob(b.into()),
            Object::Tree(t) => Self::Tree(t.into()),
            Object::Commit(c) => Self::Commit(c.into()),
            Object::Label(l) => Self::Label(l.clone()),
        }
    }
}

impl TryFrom<ObjectRecord> for Object {
    type Error = ObjectError;

    fn try_from(record: ObjectRecord) -> Result<Self, Self::Error> {
        Ok(match record {
            ObjectRecord::Blob(r) => Self::Blob(r.try_into()?),
            ObjectRecord::Tree(r) => Self::Tree(r.try_into()?),
            ObjectRecord::Commit(r) => Self::Commit(r.try_into()?),
            ObjectRecord::Label(l) => Self::Label(l),
        })
    }
}

impl From<Blob> for Object {
    fn from(b: Blob) -> Self {
        Self::Blob(b)
    }
}

impl From<Tree> for Object {
    fn from(t: Tree) -> Self {
        Self::Tree(t)
    }
}

impl From<Commit> for Object {
    fn from(c: Commit) -> Self {
        Self::Commit(c)
    }
}

impl From<Label> for Object {
    fn from(l: Label) -> Self {
        Self::Label(l)
    }
}

/// Fail with `InvalidObject` unless `expected` equals the recomputed id.
pub(crate) fn check_id(
    object_type: ObjectType,
    expected: &str,
    actual: &str,
) -> Result<(), ObjectError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ObjectError::InvalidObject {
            object_type: object_type.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_hex_sha256() {
        let id = hash_object(ObjectType::Blob, b"hello");
        assert!(is_object_id(&id));
    }

    #[test]
    fn test_type_header_separates_ids() {
        assert_ne!(
            hash_object(ObjectType::Blob, b""),
            hash_object(ObjectType::Tree, b"")
        );
    }

    #[test]
    fn test_is_object_id() {
        assert!(!is_object_id("main"));
        assert!(!is_object_id(&"g".repeat(64)));
        assert!(is_object_id(&"a".repeat(64)));
    }

    #[test]
    fn test_record_round_trip_keeps_id() {
        let blob = Blob::new("line\n");
        let obj = Object::from(blob.clone());
        let json = serde_json::to_string(&ObjectRecord::from(&obj)).unwrap();
        assert!(json.contains("\"type\":\"blob\""));
        let record: ObjectRecord = serde_json::from_str(&json).unwrap();
        let back = Object::try_from(record).unwrap();
        assert_eq!(back.object_id(), blob.id());
        assert_eq!(back.object_type(), ObjectType::Blob);
    }

    #[test]
    fn test_tampered_record_is_rejected() {
        let obj = Object::from(Blob::new("original"));
        let json = serde_json::to_string(&ObjectRecord::from(&obj))
            .unwrap()
            .replace("original", "altered");
        let record: ObjectRecord = serde_json::from_str(&json).unwrap();
        let err = Object::try_from(record).unwrap_err();
        assert!(matches!(err, ObjectError::InvalidObject { .. }));
    }

    #[test]
    fn test_label_record_round_trip() {
        let obj = Object::from(Label::new("main", "abc"));
        let json = serde_json::to_string(&ObjectRecord::from(&obj)).unwrap();
        let record: ObjectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(Object::try_from(record).unwrap(), obj);
    }
}
