//! Directory snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{check_id, ContentAddressed, ObjectId, ObjectType};
use crate::errors::ObjectError;

/// One directory level: file names mapped to blob ids and subdirectory names
/// mapped to tree ids.
///
/// Entries are kept sorted, so the id does not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    id: ObjectId,
    files: BTreeMap<String, ObjectId>,
    trees: BTreeMap<String, ObjectId>,
}

/// Stored shape of a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeRecord {
    pub id: ObjectId,
    #[serde(default)]
    pub files: BTreeMap<String, ObjectId>,
    #[serde(default)]
    pub trees: BTreeMap<String, ObjectId>,
}

impl Tree {
    pub fn new<F, T>(files: F, trees: T) -> Result<Self, ObjectError>
    where
        F: IntoIterator<Item = (String, ObjectId)>,
        T: IntoIterator<Item = (String, ObjectId)>,
    {
        let files = collect_entries(files)?;
        let trees = collect_entries(trees)?;
        if let Some(name) = files.keys().find(|name| trees.contains_key(*name)) {
            return Err(ObjectError::InvalidTreeEntry {
                name: name.clone(),
                detail: "used for both a file and a subtree".into(),
            });
        }

        let mut tree = Self {
            id: ObjectId::new(),
            files,
            trees,
        };
        tree.id = tree.compute_id();
        Ok(tree)
    }

    /// A tree with no entries.
    pub fn empty() -> Self {
        let mut tree = Self {
            id: ObjectId::new(),
            files: BTreeMap::new(),
            trees: BTreeMap::new(),
        };
        tree.id = tree.compute_id();
        tree
    }

    /// Rebuild a tree whose id is already known, verifying it.
    pub fn with_id<F, T>(id: impl Into<ObjectId>, files: F, trees: T) -> Result<Self, ObjectError>
    where
        F: IntoIterator<Item = (String, ObjectId)>,
        T: IntoIterator<Item = (String, ObjectId)>,
    {
        let id = id.into();
        let tree = Self::new(files, trees)?;
        check_id(ObjectType::Tree, &id, &tree.id)?;
        Ok(tree)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn files(&self) -> &BTreeMap<String, ObjectId> {
        &self.files
    }

    pub fn trees(&self) -> &BTreeMap<String, ObjectId> {
        &self.trees
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.trees.is_empty()
    }
}

fn collect_entries<I>(entries: I) -> Result<BTreeMap<String, ObjectId>, ObjectError>
where
    I: IntoIterator<Item = (String, ObjectId)>,
{
    let mut map = BTreeMap::new();
    for (name, id) in entries {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(ObjectError::InvalidTreeEntry {
                name,
                detail: "entry names must be a single non-empty path component".into(),
            });
        }
        // NUL and newline delimit entries in the canonical encoding.
        if name.contains(&['\0', '\n'][..]) {
            return Err(ObjectError::InvalidTreeEntry {
                name,
                detail: "entry names must not contain NUL or newline".into(),
            });
        }
        if map.insert(name.clone(), id).is_some() {
            return Err(ObjectError::InvalidTreeEntry {
                name,
                detail: "duplicate entry name".into(),
            });
        }
    }
    Ok(map)
}

impl ContentAddressed for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (kind, entries) in [("file", &self.files), ("tree", &self.trees)] {
            for (name, id) in entries {
                out.extend_from_slice(kind.as_bytes());
                out.push(b' ');
                out.extend_from_slice(name.as_bytes());
                out.push(0);
                out.extend_from_slice(id.as_bytes());
                out.push(b'\n');
            }
        }
        out
    }
}

impl TryFrom<TreeRecord> for Tree {
    type Error = ObjectError;

    fn try_from(record: TreeRecord) -> Result<Self, Self::Error> {
        Self::with_id(record.id, record.files, record.trees)
    }
}

impl From<&Tree> for TreeRecord {
    fn from(tree: &Tree) -> Self {
        Self {
            id: tree.id.clone(),
            files: tree.files.clone(),
            trees: tree.trees.clone(),
        }
    }
}
