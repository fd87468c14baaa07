//! Three-way merge engine.
//!
//! Both sides are diffed against the same base. Because the diff engine
//! anchors every change at a base position, changes touching the same base
//! location land in the same bucket and can be compared directly.

use std::collections::BTreeMap;

use tracing::{debug, info, trace};

use super::conflict::{Conflict, ConflictMarkers};
use crate::diff::{diff_sequences, split_lines, Change, ChangeAction, Diff, MergeElement};

/// Equal in everything except `new_position`.
///
/// Unrelated insertions earlier in either file shift `new_position` without
/// any real divergence, so it takes no part in the comparison.
pub fn same_change<T: PartialEq>(one: &Change<T>, two: &Change<T>) -> bool {
    one.action == two.action
        && one.old_position == two.old_position
        && one.old_element == two.old_element
        && one.new_element == two.new_element
}

/// Same length and pairwise [`same_change`].
pub fn same_changes<T: PartialEq>(one: &[Change<T>], two: &[Change<T>]) -> bool {
    one.len() == two.len() && one.iter().zip(two).all(|(a, b)| same_change(a, b))
}

/// Diff `one` and `two` against `base` and combine the results.
pub fn three_way_merge<T: PartialEq + Clone>(base: &[T], one: &[T], two: &[T]) -> Diff<T> {
    let diff_one = diff_sequences(base, one);
    let diff_two = diff_sequences(base, two);
    combine_diffs(&diff_one, &diff_two)
}

/// Merge two diffs taken against the same base.
///
/// Changes are bucketed by `old_position` and the buckets visited in
/// ascending order. Insertions ahead of the first base element get a bucket
/// of their own, ordered before element 0, so a prepended line never
/// collides with an edit just after that element. Conflict entries already
/// present in the inputs are ignored.
pub fn combine_diffs<T: PartialEq + Clone>(diff_one: &Diff<T>, diff_two: &Diff<T>) -> Diff<T> {
    let mut buckets: BTreeMap<Option<usize>, (Vec<Change<T>>, Vec<Change<T>>)> = BTreeMap::new();
    for (key, change) in bucket_keys(diff_one) {
        buckets.entry(key).or_default().0.push(change.clone());
    }
    for (key, change) in bucket_keys(diff_two) {
        buckets.entry(key).or_default().1.push(change.clone());
    }

    let mut elements = Vec::new();
    for (position, (one, two)) in buckets {
        if two.iter().all(Change::is_unchanged) {
            elements.extend(one.into_iter().map(MergeElement::Change));
        } else if one.iter().all(Change::is_unchanged) {
            elements.extend(two.into_iter().map(MergeElement::Change));
        } else if same_changes(&one, &two) {
            elements.extend(one.into_iter().map(MergeElement::Change));
        } else {
            trace!(position = ?position, "changesets collide");
            elements.extend(extract_conflict(&one, &two));
        }
    }
    Diff::new(elements)
}

/// Pair each change with its bucket: `None` for the insertions that precede
/// every base element, `Some(old_position)` for everything else.
fn bucket_keys<T>(diff: &Diff<T>) -> impl Iterator<Item = (Option<usize>, &Change<T>)> {
    let mut leading = true;
    diff.changes().map(move |change| {
        leading &= change.action == ChangeAction::Insert;
        let key = (!leading).then_some(change.old_position);
        (key, change)
    })
}

/// Split two colliding changesets into shared prefix, conflict, shared
/// suffix.
///
/// The prefix and suffix are each the longest run of pairwise
/// [`same_change`]s from their end. When they would overlap, the suffix is
/// shortened so that every change is emitted exactly once.
pub fn extract_conflict<T: PartialEq + Clone>(
    one: &[Change<T>],
    two: &[Change<T>],
) -> Vec<MergeElement<T>> {
    let prefix = one
        .iter()
        .zip(two)
        .take_while(|(a, b)| same_change(a, b))
        .count();
    let suffix = one
        .iter()
        .rev()
        .zip(two.iter().rev())
        .take_while(|(a, b)| same_change(a, b))
        .count()
        .min(one.len().min(two.len()) - prefix);

    let middle_one = Diff::from_changes(one[prefix..one.len() - suffix].iter().cloned());
    let middle_two = Diff::from_changes(two[prefix..two.len() - suffix].iter().cloned());

    let mut elements = Vec::with_capacity(prefix + suffix + 1);
    elements.extend(one[..prefix].iter().cloned().map(MergeElement::Change));
    elements.push(MergeElement::Conflict(Conflict::new(middle_one, middle_two)));
    elements.extend(one[one.len() - suffix..].iter().cloned().map(MergeElement::Change));
    elements
}

// ---------------------------------------------------------------------------
// Text convenience
// ---------------------------------------------------------------------------

/// The result of a line-based three-way merge of text.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// The merged content (contains conflict markers if `has_conflicts`).
    pub merged_content: String,
    /// Whether any conflict was rendered.
    pub has_conflicts: bool,
    /// Number of conflict regions.
    pub conflict_count: usize,
    /// Whether the result differs from the base.
    pub has_changes: bool,
}

/// Stateless line-based merge of whole texts.
pub struct Merger;

impl Merger {
    /// Merge `ours` and `theirs` against `base` line by line.
    ///
    /// Always returns merged content; conflicting spans are rendered between
    /// `markers`.
    pub fn merge_text(base: &str, ours: &str, theirs: &str, markers: &ConflictMarkers) -> MergeResult {
        let diff = three_way_merge(&split_lines(base), &split_lines(ours), &split_lines(theirs));
        let conflict_count = diff.conflict_count();
        if conflict_count > 0 {
            info!(conflict_count, "three-way merge produced conflicts");
        } else {
            debug!("three-way merge is clean");
        }
        MergeResult {
            merged_content: diff.new_content(markers),
            has_conflicts: conflict_count > 0,
            conflict_count,
            has_changes: diff.has_changes(),
        }
    }

    /// Quick check: can these three versions be merged without conflicts?
    pub fn can_auto_merge(base: &str, ours: &str, theirs: &str) -> bool {
        if ours == base || theirs == base || ours == theirs {
            return true;
        }
        !three_way_merge(&split_lines(base), &split_lines(ours), &split_lines(theirs))
            .has_conflicts()
    }
}
