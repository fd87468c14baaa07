//! Staging area collaborators.
//!
//! A [`StagingArea`] is the mutable working set of files a commit is built
//! from and a merge writes into. Paths are relative and `/`-separated; the
//! empty string names the root directory.

pub mod fs;
pub mod memory;

pub use fs::FsStaging;
pub use memory::MemoryStaging;

use crate::errors::StagingError;

/// Plain file access over the working set.
pub trait StagingArea {
    /// Whether a file exists at `path`.
    fn has(&self, path: &str) -> Result<bool, StagingError>;

    /// Read a file, failing with [`StagingError::NotFound`] if absent.
    fn read(&self, path: &str) -> Result<String, StagingError>;

    /// Create or overwrite a file, creating parent directories as needed.
    fn write(&mut self, path: &str, content: &str) -> Result<(), StagingError>;

    /// Remove a file. Removing an absent file is not an error.
    fn delete(&mut self, path: &str) -> Result<(), StagingError>;

    /// Names (not paths) of the files directly inside `dir`, sorted.
    fn list_files(&self, dir: &str) -> Result<Vec<String>, StagingError>;

    /// Names of the subdirectories directly inside `dir`, sorted.
    fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StagingError>;
}

impl<S: StagingArea + ?Sized> StagingArea for Box<S> {
    fn has(&self, path: &str) -> Result<bool, StagingError> {
        (**self).has(path)
    }

    fn read(&self, path: &str) -> Result<String, StagingError> {
        (**self).read(path)
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StagingError> {
        (**self).write(path, content)
    }

    fn delete(&mut self, path: &str) -> Result<(), StagingError> {
        (**self).delete(path)
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        (**self).list_files(dir)
    }

    fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        (**self).list_dirs(dir)
    }
}

/// Join a directory and a name into a staging path.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Normalize a staging path, rejecting anything that could escape the root.
///
/// Leading/trailing separators and `.` components are dropped. Absolute
/// paths, backslashes and `..` components are errors.
pub fn normalize_path(path: &str) -> Result<String, StagingError> {
    let invalid = |detail: &str| StagingError::InvalidPath {
        path: path.to_string(),
        detail: detail.to_string(),
    };

    if path.starts_with('/') {
        return Err(invalid("absolute paths are not allowed"));
    }
    if path.contains('\\') {
        return Err(invalid("use '/' as the path separator"));
    }

    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(invalid("'..' components are not allowed")),
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a.txt"), "a.txt");
        assert_eq!(join_path("src", "a.txt"), "src/a.txt");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("src//lib.rs").unwrap(), "src/lib.rs");
        assert_eq!(normalize_path("./a/./b/").unwrap(), "a/b");
        assert_eq!(normalize_path("").unwrap(), "");
    }

    #[test]
    fn test_normalize_rejects_escapes() {
        assert!(matches!(normalize_path("/etc/passwd"), Err(StagingError::InvalidPath { .. })));
        assert!(matches!(normalize_path("a/../../b"), Err(StagingError::InvalidPath { .. })));
        assert!(matches!(normalize_path("a\\b"), Err(StagingError::InvalidPath { .. })));
    }
}
