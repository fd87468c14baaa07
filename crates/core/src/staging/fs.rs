//! Filesystem staging area rooted at a working directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{normalize_path, StagingArea};
use crate::config::METADATA_DIR;
use crate::errors::StagingError;

/// Staging area over a real directory tree.
///
/// The repository metadata directory at the root is invisible: it is never
/// listed and cannot be read or written through this type.
#[derive(Debug, Clone)]
pub struct FsStaging {
    root: PathBuf,
}

impl FsStaging {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a staging path to a location under the root.
    fn resolve(&self, path: &str) -> Result<(String, PathBuf), StagingError> {
        let rel = normalize_path(path)?;
        if rel == METADATA_DIR || rel.starts_with(&format!("{}/", METADATA_DIR)) {
            return Err(StagingError::InvalidPath {
                path: path.to_string(),
                detail: "the metadata directory is not part of the working set".into(),
            });
        }
        let full = rel
            .split('/')
            .filter(|p| !p.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part));
        Ok((rel, full))
    }

    /// Entry names directly under `dir` whose file type passes `want`.
    fn list_entries(
        &self,
        dir: &str,
        want: impl Fn(&std::fs::FileType) -> bool,
    ) -> Result<Vec<String>, StagingError> {
        let (rel, full) = self.resolve(dir)?;
        let entries = match std::fs::read_dir(&full) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !want(&entry.file_type()?) {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if rel.is_empty() && name == METADATA_DIR {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Remove now-empty directories from `start` upwards, stopping at the root.
    fn prune_empty_parents(&self, start: Option<&Path>) {
        let mut current = start;
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            // Fails (and stops the walk) as soon as a directory is non-empty.
            if std::fs::remove_dir(dir).is_err() {
                break;
            }
            debug!(dir = %dir.display(), "removed empty directory");
            current = dir.parent();
        }
    }
}

impl StagingArea for FsStaging {
    fn has(&self, path: &str) -> Result<bool, StagingError> {
        let (_, full) = self.resolve(path)?;
        Ok(full.is_file())
    }

    fn read(&self, path: &str) -> Result<String, StagingError> {
        let (rel, full) = self.resolve(path)?;
        match std::fs::read_to_string(&full) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StagingError::NotFound(rel)),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StagingError> {
        let (rel, full) = self.resolve(path)?;
        if rel.is_empty() {
            return Err(StagingError::InvalidPath {
                path: path.to_string(),
                detail: "cannot write to the root directory".into(),
            });
        }
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, content)?;
        debug!(path = %rel, bytes = content.len(), "wrote staged file");
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), StagingError> {
        let (rel, full) = self.resolve(path)?;
        match std::fs::remove_file(&full) {
            Ok(()) => {
                debug!(path = %rel, "deleted staged file");
                self.prune_empty_parents(full.parent());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        self.list_entries(dir, |t| t.is_file())
    }

    fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        self.list_entries(dir, |t| t.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staging() -> (tempfile::TempDir, FsStaging) {
        let dir = tempfile::tempdir().unwrap();
        let staging = FsStaging::new(dir.path());
        (dir, staging)
    }

    #[test]
    fn test_write_creates_parents() {
        let (dir, mut staging) = staging();
        staging.write("src/nested/lib.rs", "fn main() {}\n").unwrap();
        assert!(dir.path().join("src/nested/lib.rs").is_file());
        assert_eq!(staging.read("src/nested/lib.rs").unwrap(), "fn main() {}\n");
    }

    #[test]
    fn test_read_missing() {
        let (_dir, staging) = staging();
        assert!(matches!(staging.read("nope.txt"), Err(StagingError::NotFound(_))));
        assert!(!staging.has("nope.txt").unwrap());
    }

    #[test]
    fn test_listing_hides_metadata_dir() {
        let (dir, mut staging) = staging();
        std::fs::create_dir_all(dir.path().join(".arbor")).unwrap();
        std::fs::write(dir.path().join(".arbor/config.toml"), "").unwrap();
        staging.write("a.txt", "a").unwrap();
        staging.write("lib/b.txt", "b").unwrap();

        assert_eq!(staging.list_files("").unwrap(), vec!["a.txt"]);
        assert_eq!(staging.list_dirs("").unwrap(), vec!["lib"]);
        assert!(matches!(staging.read(".arbor/config.toml"), Err(StagingError::InvalidPath { .. })));
    }

    #[test]
    fn test_delete_prunes_empty_directories() {
        let (dir, mut staging) = staging();
        staging.write("a/b/c.txt", "c").unwrap();
        staging.write("a/keep.txt", "k").unwrap();
        staging.delete("a/b/c.txt").unwrap();

        assert!(!dir.path().join("a/b").exists());
        assert!(dir.path().join("a").is_dir());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let (_dir, mut staging) = staging();
        staging.delete("ghost.txt").unwrap();
    }

    #[test]
    fn test_rejects_escape() {
        let (_dir, mut staging) = staging();
        assert!(matches!(staging.write("../outside.txt", "x"), Err(StagingError::InvalidPath { .. })));
        assert!(matches!(staging.has("/etc/passwd"), Err(StagingError::InvalidPath { .. })));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let (_dir, staging) = staging();
        assert!(staging.list_files("absent").unwrap().is_empty());
        assert!(staging.list_dirs("absent").unwrap().is_empty());
    }
}
