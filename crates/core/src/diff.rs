//! Sequence diff engine.
//!
//! [`diff_sequences`] aligns two sequences by longest common subsequence and
//! emits an edit script of [`Change`]s. Every change carries an
//! `old_position` anchored in the base sequence; the merge engine groups
//! changes from two diffs of the same base by that anchor, so the script
//! must be fully deterministic for a given pair of inputs.

use serde::Serialize;
use tracing::trace;

use crate::merge::{Conflict, ConflictMarkers};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What a single [`Change`] does to its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Unchanged,
    Insert,
    Delete,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Insert => write!(f, "insert"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Atomic edit unit.
///
/// `old_position` is the merge key. For unchanged and deleted elements it is
/// the element's index in the base; for an insertion it is the index of the
/// base element the insertion follows (0 when nothing precedes it).
/// `new_position` is the index in the target, or for a deletion the index
/// the next surviving element lands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change<T> {
    pub action: ChangeAction,
    pub old_position: usize,
    pub new_position: usize,
    pub old_element: Option<T>,
    pub new_element: Option<T>,
}

impl<T: Clone> Change<T> {
    pub fn unchanged(old_position: usize, new_position: usize, element: T) -> Self {
        Self {
            action: ChangeAction::Unchanged,
            old_position,
            new_position,
            old_element: Some(element.clone()),
            new_element: Some(element),
        }
    }
}

impl<T> Change<T> {
    pub fn insert(anchor: usize, new_position: usize, element: T) -> Self {
        Self {
            action: ChangeAction::Insert,
            old_position: anchor,
            new_position,
            old_element: None,
            new_element: Some(element),
        }
    }

    pub fn delete(old_position: usize, new_position: usize, element: T) -> Self {
        Self {
            action: ChangeAction::Delete,
            old_position,
            new_position,
            old_element: Some(element),
            new_element: None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.action == ChangeAction::Unchanged
    }
}

/// One entry of a (possibly merged) diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeElement<T> {
    Change(Change<T>),
    Conflict(Conflict<T>),
}

/// Ordered edit script. Diffs produced by [`diff_sequences`] hold only
/// changes; merged diffs may also hold conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T> {
    elements: Vec<MergeElement<T>>,
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
        }
    }
}

impl<T> Diff<T> {
    pub fn new(elements: Vec<MergeElement<T>>) -> Self {
        Self { elements }
    }

    pub fn from_changes<I: IntoIterator<Item = Change<T>>>(changes: I) -> Self {
        Self {
            elements: changes.into_iter().map(MergeElement::Change).collect(),
        }
    }

    pub fn elements(&self) -> &[MergeElement<T>] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<MergeElement<T>> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Plain changes, skipping conflicts.
    pub fn changes(&self) -> impl Iterator<Item = &Change<T>> {
        self.elements.iter().filter_map(|e| match e {
            MergeElement::Change(c) => Some(c),
            MergeElement::Conflict(_) => None,
        })
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict<T>> {
        self.elements.iter().filter_map(|e| match e {
            MergeElement::Change(_) => None,
            MergeElement::Conflict(c) => Some(c),
        })
    }

    /// True if any element is not `unchanged`. A conflict counts as a change.
    pub fn has_changes(&self) -> bool {
        self.elements.iter().any(|e| match e {
            MergeElement::Change(c) => !c.is_unchanged(),
            MergeElement::Conflict(_) => true,
        })
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflict_count() > 0
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts().count()
    }
}

impl<T: Clone> Diff<T> {
    /// The target sequence, or `None` if the diff contains conflicts.
    pub fn new_sequence(&self) -> Option<Vec<T>> {
        let mut out = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            match element {
                MergeElement::Change(c) => out.extend(c.new_element.iter().cloned()),
                MergeElement::Conflict(_) => return None,
            }
        }
        Some(out)
    }
}

impl<T: Clone + PartialEq> Diff<T> {
    /// Apply the change list to `base`.
    ///
    /// Every unchanged or deleted element must sit at its recorded
    /// `old_position` in `base` and every base element must be consumed
    /// exactly once, otherwise `None`. Conflicted diffs cannot be applied.
    pub fn patch(&self, base: &[T]) -> Option<Vec<T>> {
        let mut out = Vec::with_capacity(base.len());
        let mut cursor = 0;
        for element in &self.elements {
            let change = match element {
                MergeElement::Change(c) => c,
                MergeElement::Conflict(_) => return None,
            };
            match change.action {
                ChangeAction::Insert => out.push(change.new_element.clone()?),
                ChangeAction::Unchanged | ChangeAction::Delete => {
                    if change.old_position != cursor
                        || base.get(cursor) != change.old_element.as_ref()
                    {
                        return None;
                    }
                    if change.action == ChangeAction::Unchanged {
                        out.push(base[cursor].clone());
                    }
                    cursor += 1;
                }
            }
        }
        (cursor == base.len()).then_some(out)
    }
}

impl<T: AsRef<str>> Diff<T> {
    /// Materialize the result as text, rendering each conflict between the
    /// given markers.
    pub fn new_content(&self, markers: &ConflictMarkers) -> String {
        let mut out = String::new();
        for element in &self.elements {
            match element {
                MergeElement::Change(c) => {
                    if let Some(e) = &c.new_element {
                        out.push_str(e.as_ref());
                    }
                }
                MergeElement::Conflict(conflict) => {
                    terminate_line(&mut out);
                    out.push_str(&markers.start);
                    push_side(&mut out, &conflict.diff_one);
                    out.push_str(&markers.separator);
                    push_side(&mut out, &conflict.diff_two);
                    out.push_str(&markers.end);
                }
            }
        }
        out
    }
}

fn push_side<T: AsRef<str>>(out: &mut String, side: &Diff<T>) {
    for change in side.changes() {
        if let Some(e) = &change.new_element {
            out.push_str(e.as_ref());
        }
    }
    terminate_line(out);
}

fn terminate_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// Compute a minimal edit script turning `base` into `target`.
///
/// The common prefix and suffix are matched directly; only the window
/// between them is aligned with a suffix LCS table. The walk matches equal
/// elements as early as possible and, when a deletion and an insertion are
/// equally good, deletes first.
pub fn diff_sequences<T: PartialEq + Clone>(base: &[T], target: &[T]) -> Diff<T> {
    let prefix = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = base[prefix..]
        .iter()
        .rev()
        .zip(target[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut changes = Vec::with_capacity(base.len().max(target.len()));
    for (i, element) in base[..prefix].iter().enumerate() {
        changes.push(Change::unchanged(i, i, element.clone()));
    }

    let a = &base[prefix..base.len() - suffix];
    let b = &target[prefix..target.len() - suffix];
    let table = LcsTable::build(a, b);

    let (mut i, mut j) = (0, 0);
    let mut anchor = prefix.saturating_sub(1);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            changes.push(Change::unchanged(prefix + i, prefix + j, a[i].clone()));
            anchor = prefix + i;
            i += 1;
            j += 1;
        } else if i < a.len() && (j == b.len() || table.get(i + 1, j) >= table.get(i, j + 1)) {
            changes.push(Change::delete(prefix + i, prefix + j, a[i].clone()));
            anchor = prefix + i;
            i += 1;
        } else {
            changes.push(Change::insert(anchor, prefix + j, b[j].clone()));
            j += 1;
        }
    }

    let (base_tail, target_tail) = (base.len() - suffix, target.len() - suffix);
    for (k, element) in base[base_tail..].iter().enumerate() {
        changes.push(Change::unchanged(base_tail + k, target_tail + k, element.clone()));
    }

    trace!(
        base_len = base.len(),
        target_len = target.len(),
        common_prefix = prefix,
        common_suffix = suffix,
        lcs = prefix + suffix + table.get(0, 0),
        "diffed sequences"
    );
    Diff::from_changes(changes)
}

/// `get(i, j)` is the LCS length of `a[i..]` and `b[j..]`.
struct LcsTable {
    width: usize,
    cells: Vec<usize>,
}

impl LcsTable {
    fn build<T: PartialEq>(a: &[T], b: &[T]) -> Self {
        let width = b.len() + 1;
        let mut cells = vec![0; (a.len() + 1) * width];
        for i in (0..a.len()).rev() {
            for j in (0..b.len()).rev() {
                cells[i * width + j] = if a[i] == b[j] {
                    cells[(i + 1) * width + j + 1] + 1
                } else {
                    cells[(i + 1) * width + j].max(cells[i * width + j + 1])
                };
            }
        }
        Self { width, cells }
    }

    fn get(&self, i: usize, j: usize) -> usize {
        self.cells[i * self.width + j]
    }
}

/// Split text into lines, keeping each line's terminator.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn actions(diff: &Diff<char>) -> Vec<ChangeAction> {
        diff.changes().map(|c| c.action).collect()
    }

    #[test]
    fn test_identical_sequences_only_unchanged() {
        let s = chars("abcdef");
        let diff = diff_sequences(&s, &s);
        assert!(!diff.has_changes());
        assert_eq!(diff.len(), 6);
        assert!(diff.changes().all(|c| c.old_position == c.new_position));
    }

    #[test]
    fn test_empty_inputs() {
        let empty: Vec<char> = Vec::new();
        assert!(diff_sequences(&empty, &empty).is_empty());

        let diff = diff_sequences(&empty, &chars("ab"));
        assert_eq!(actions(&diff), vec![ChangeAction::Insert, ChangeAction::Insert]);
        assert!(diff.changes().all(|c| c.old_position == 0));

        let diff = diff_sequences(&chars("ab"), &empty);
        assert_eq!(actions(&diff), vec![ChangeAction::Delete, ChangeAction::Delete]);
    }

    #[test]
    fn test_replacement_deletes_before_inserting() {
        let diff = diff_sequences(&chars("abc"), &chars("aXc"));
        assert_eq!(
            actions(&diff),
            vec![
                ChangeAction::Unchanged,
                ChangeAction::Delete,
                ChangeAction::Insert,
                ChangeAction::Unchanged,
            ]
        );
        let insert = diff.changes().nth(2).unwrap();
        assert_eq!(insert.old_position, 1);
        assert_eq!(insert.new_position, 1);
        assert_eq!(insert.new_element, Some('X'));
        assert_eq!(insert.old_element, None);
    }

    #[test]
    fn test_insert_anchors_to_preceding_base_element() {
        let diff = diff_sequences(&chars("abc"), &chars("abZc"));
        let insert = diff
            .changes()
            .find(|c| c.action == ChangeAction::Insert)
            .unwrap();
        assert_eq!(insert.old_position, 1);
        assert_eq!(insert.new_position, 2);

        let diff = diff_sequences(&chars("abc"), &chars("Pabc"));
        let insert = diff.changes().next().unwrap();
        assert_eq!(insert.action, ChangeAction::Insert);
        assert_eq!(insert.old_position, 0);
    }

    #[test]
    fn test_script_is_minimal() {
        let diff = diff_sequences(&chars("ABCABBA"), &chars("CBABAC"));
        let edits = diff.changes().filter(|c| !c.is_unchanged()).count();
        // LCS length is 4: 7 + 6 - 2 * 4 edits.
        assert_eq!(edits, 5);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let a = chars("xaxbxcx");
        let b = chars("axbxxcxx");
        assert_eq!(diff_sequences(&a, &b), diff_sequences(&a, &b));
    }

    #[test]
    fn test_patch_reconstructs_target() {
        let cases = [
            ("", ""),
            ("", "abc"),
            ("abc", ""),
            ("abc", "abc"),
            ("abc", "aXc"),
            ("abcabba", "cbabac"),
            ("kitten", "sitting"),
            ("aaaa", "aa"),
            ("ab", "ba"),
        ];
        for (a, b) in cases {
            let (a, b) = (chars(a), chars(b));
            let diff = diff_sequences(&a, &b);
            assert_eq!(diff.patch(&a), Some(b.clone()), "patching {:?} -> {:?}", a, b);
            assert_eq!(diff.new_sequence(), Some(b));
        }
    }

    #[test]
    fn test_patch_rejects_wrong_base() {
        let diff = diff_sequences(&chars("abc"), &chars("abd"));
        assert_eq!(diff.patch(&chars("xbc")), None);
        assert_eq!(diff.patch(&chars("abcd")), None);
    }

    #[test]
    fn test_common_suffix_keeps_positions() {
        let diff = diff_sequences(&chars("abcde"), &chars("aXbcde"));
        let tail: Vec<(usize, usize)> = diff
            .changes()
            .skip(2)
            .map(|c| (c.old_position, c.new_position))
            .collect();
        assert_eq!(tail, vec![(1, 2), (2, 3), (3, 4), (4, 5)]);
        assert!(diff.changes().skip(2).all(Change::is_unchanged));
    }

    #[test]
    fn test_long_sequence_with_edit_near_front() {
        let base: Vec<usize> = (0..20_000).collect();
        let mut target = base.clone();
        target[3] = usize::MAX;

        let diff = diff_sequences(&base, &target);
        let edits: Vec<&Change<usize>> = diff.changes().filter(|c| !c.is_unchanged()).collect();
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].action, ChangeAction::Delete);
        assert_eq!(edits[0].old_position, 3);
        assert_eq!(edits[1].action, ChangeAction::Insert);
        assert_eq!(edits[1].old_position, 3);
        assert_eq!(diff.patch(&base), Some(target));
    }

    #[test]
    fn test_split_lines_keeps_terminators() {
        assert_eq!(split_lines("a\nb\n"), vec!["a\n", "b\n"]);
        assert_eq!(split_lines("a\nb"), vec!["a\n", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_new_content_without_conflicts() {
        let base = split_lines("one\ntwo\n");
        let target = split_lines("one\n2\n");
        let diff = diff_sequences(&base, &target);
        let markers = ConflictMarkers::for_commits("a", "b");
        assert_eq!(diff.new_content(&markers), "one\n2\n");
    }
}
