//! Conflict nodes and their textual markers.

use crate::diff::Diff;

/// Two irreconcilable sub-diffs over the same base span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict<T> {
    /// Divergent changes from the first side.
    pub diff_one: Diff<T>,
    /// Divergent changes from the second side.
    pub diff_two: Diff<T>,
}

impl<T> Conflict<T> {
    pub fn new(diff_one: Diff<T>, diff_two: Diff<T>) -> Self {
        Self { diff_one, diff_two }
    }

    /// Smallest base position touched by either side, if any.
    pub fn anchor(&self) -> Option<usize> {
        self.diff_one
            .changes()
            .chain(self.diff_two.changes())
            .map(|c| c.old_position)
            .min()
    }
}

impl<T: Clone> Conflict<T> {
    /// Elements the first side would produce for this span.
    pub fn ours(&self) -> Vec<T> {
        self.diff_one.new_sequence().unwrap_or_default()
    }

    /// Elements the second side would produce for this span.
    pub fn theirs(&self) -> Vec<T> {
        self.diff_two.new_sequence().unwrap_or_default()
    }
}

/// Full marker lines written around a rendered conflict. Each includes its
/// trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictMarkers {
    pub start: String,
    pub separator: String,
    pub end: String,
}

pub const DEFAULT_START: &str = "<<<<<";
pub const DEFAULT_SEPARATOR: &str = "=====";
pub const DEFAULT_END: &str = ">>>>>";

impl ConflictMarkers {
    /// Markers `<<<<< {id_one}`, `=====`, `>>>>> {id_two}`.
    pub fn for_commits(id_one: &str, id_two: &str) -> Self {
        Self::with_prefixes(DEFAULT_START, DEFAULT_SEPARATOR, DEFAULT_END, id_one, id_two)
    }

    /// Markers built from custom delimiter strings.
    pub fn with_prefixes(
        start: &str,
        separator: &str,
        end: &str,
        id_one: &str,
        id_two: &str,
    ) -> Self {
        Self {
            start: format!("{} {}\n", start, id_one),
            separator: format!("{}\n", separator),
            end: format!("{} {}\n", end, id_two),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Change;

    #[test]
    fn test_default_markers() {
        let m = ConflictMarkers::for_commits("aaa", "bbb");
        assert_eq!(m.start, "<<<<< aaa\n");
        assert_eq!(m.separator, "=====\n");
        assert_eq!(m.end, ">>>>> bbb\n");
    }

    #[test]
    fn test_anchor_and_sides() {
        let conflict = Conflict::new(
            Diff::from_changes(vec![Change::insert(3, 4, 'X')]),
            Diff::from_changes(vec![Change::delete(2, 2, 'c'), Change::insert(2, 2, 'Y')]),
        );
        assert_eq!(conflict.anchor(), Some(2));
        assert_eq!(conflict.ours(), vec!['X']);
        assert_eq!(conflict.theirs(), vec!['Y']);
    }

    #[test]
    fn test_empty_conflict_has_no_anchor() {
        let conflict: Conflict<char> = Conflict::new(Diff::default(), Diff::default());
        assert_eq!(conflict.anchor(), None);
    }
}
