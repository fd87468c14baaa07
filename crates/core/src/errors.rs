//! Error types for the arbor core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! Merge divergence has no variant here. Conflicts are reported as data on
//! [`crate::diff::Diff`] and [`crate::repository::MergeReport`], never as
//! errors.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Object model errors
// ---------------------------------------------------------------------------

/// Errors raised while constructing or resolving content-addressed objects.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// An explicit id did not match the hash recomputed from the object's
    /// fields. Signals corruption or tampering.
    #[error("invalid {object_type} object: expected id {expected}, content hashes to {actual}")]
    InvalidObject {
        object_type: String,
        expected: String,
        actual: String,
    },

    /// A tree entry name cannot be represented.
    #[error("invalid tree entry '{name}': {detail}")]
    InvalidTreeEntry {
        name: String,
        detail: String,
    },

    /// A reference resolved to something that is neither a commit nor a
    /// label, or label indirection never reached a commit.
    #[error("unknown reference: {0}")]
    UnknownReference(String),
}

// ---------------------------------------------------------------------------
// Object store errors
// ---------------------------------------------------------------------------

/// Errors from object store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying rusqlite error.
    #[error("object store database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored body could not be encoded or decoded.
    #[error("object store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored object failed verification on load.
    #[error("object store integrity error: {0}")]
    Object(#[from] ObjectError),

    /// A schema migration failed.
    #[error("object store migration failed (version {version}): {detail}")]
    MigrationFailed {
        version: u32,
        detail: String,
    },

    /// Generic I/O error (e.g. file permissions).
    #[error("object store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Staging area errors
// ---------------------------------------------------------------------------

/// Errors from staging area backends.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The path is not present in the staging area.
    #[error("staged file not found: {0}")]
    NotFound(String),

    /// The path escapes the staging root or is otherwise malformed.
    #[error("invalid staging path '{path}': {detail}")]
    InvalidPath {
        path: String,
        detail: String,
    },

    /// Generic I/O wrapper.
    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Repository errors
// ---------------------------------------------------------------------------

/// Errors from the repository orchestrator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A reference did not resolve to any commit.
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// The path does not exist in the given commit's tree.
    #[error("path '{path}' not found in commit {commit}")]
    PathNotFound {
        path: String,
        commit: String,
    },

    /// The operation needs a HEAD commit but the current branch is unborn.
    #[error("no commits yet on the current branch")]
    NoCommits,

    /// A branch name was rejected.
    #[error("invalid branch name '{name}': {detail}")]
    InvalidBranchName {
        name: String,
        detail: String,
    },

    /// An object referenced by another object is missing from the store.
    #[error("{object_type} {id} is missing from the object store")]
    MissingObject {
        object_type: String,
        id: String,
    },

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Staging(#[from] StagingError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
