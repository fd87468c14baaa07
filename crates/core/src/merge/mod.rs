//! Three-way merge and conflict algebra.
//!
//! The merge subsystem is responsible for:
//! 1. **Combining** -- grouping two diffs of the same base by base anchor.
//! 2. **Resolving** -- taking whichever side touched a span, or either side
//!    when both made the identical edit.
//! 3. **Conflict extraction** -- trimming the shared prefix and suffix of
//!    two colliding changesets and wrapping the divergent middles.

pub mod conflict;
pub mod merger;

pub use conflict::{Conflict, ConflictMarkers};
pub use merger::{
    combine_diffs, extract_conflict, same_change, same_changes, three_way_merge, MergeResult,
    Merger,
};
