//! In-memory staging area.

use std::collections::{BTreeMap, BTreeSet};

use super::{normalize_path, StagingArea};
use crate::errors::StagingError;

/// Staging area backed by a sorted map of path to content. Directories exist
/// implicitly while they contain at least one file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStaging {
    files: BTreeMap<String, String>,
}

impl MemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every staged path with its content.
    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// Direct children of `dir`, split into file names and directory names.
    fn children(&self, dir: &str) -> Result<(BTreeSet<String>, BTreeSet<String>), StagingError> {
        let dir = normalize_path(dir)?;
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };

        let mut files = BTreeSet::new();
        let mut dirs = BTreeSet::new();
        for path in self.files.keys() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((subdir, _)) => {
                    dirs.insert(subdir.to_string());
                }
                None => {
                    files.insert(rest.to_string());
                }
            }
        }
        Ok((files, dirs))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryStaging {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl StagingArea for MemoryStaging {
    fn has(&self, path: &str) -> Result<bool, StagingError> {
        Ok(self.files.contains_key(&normalize_path(path)?))
    }

    fn read(&self, path: &str) -> Result<String, StagingError> {
        let path = normalize_path(path)?;
        self.files
            .get(&path)
            .cloned()
            .ok_or(StagingError::NotFound(path))
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StagingError> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Err(StagingError::InvalidPath {
                path,
                detail: "cannot write to the root directory".into(),
            });
        }
        self.files.insert(path, content.to_string());
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), StagingError> {
        self.files.remove(&normalize_path(path)?);
        Ok(())
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        Ok(self.children(dir)?.0.into_iter().collect())
    }

    fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        Ok(self.children(dir)?.1.into_iter().collect())
    }
}
