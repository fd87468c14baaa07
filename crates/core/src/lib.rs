//! Arbor core library.
//!
//! This crate provides the building blocks of a small version-control
//! engine: a content-addressed object model, a line diff, a three-way merge
//! with explicit conflicts, pluggable object stores and staging areas, and
//! the repository orchestrator that ties them together.

pub mod config;
pub mod diff;
pub mod errors;
pub mod merge;
pub mod objects;
pub mod repository;
pub mod staging;
pub mod store;

// Re-exports for convenience.
pub use config::ArborConfig;
pub use diff::{diff_sequences, Change, ChangeAction, Diff, MergeElement};
pub use errors::CoreError;
pub use merge::{three_way_merge, Conflict, ConflictMarkers, Merger};
pub use objects::{Blob, Commit, Label, Object, ObjectId, Tree, HEAD};
pub use repository::{MergeReport, Repository, Status};
pub use staging::{FsStaging, MemoryStaging, StagingArea};
pub use store::{MemoryObjectStore, ObjectStore, SqliteObjectStore};
