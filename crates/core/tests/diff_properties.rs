//! Behavioural properties of the diff and merge algebra over small
//! sequences.

use arbor_core::diff::{diff_sequences, split_lines, MergeElement};
use arbor_core::merge::{three_way_merge, ConflictMarkers};

/// Every sequence over `{a, b, c}` of length 0 to 4.
fn sequences() -> Vec<Vec<char>> {
    let mut all = vec![Vec::new()];
    let mut frontier = vec![Vec::new()];
    for _ in 0..4 {
        let mut next = Vec::new();
        for seq in &frontier {
            for c in ['a', 'b', 'c'] {
                let mut longer: Vec<char> = seq.clone();
                longer.push(c);
                next.push(longer);
            }
        }
        all.extend(next.iter().cloned());
        frontier = next;
    }
    all
}

#[test]
fn test_patch_reconstructs_target() {
    let seqs = sequences();
    for base in &seqs {
        for target in &seqs {
            let diff = diff_sequences(base, target);
            assert_eq!(diff.patch(base).as_ref(), Some(target), "{:?} -> {:?}", base, target);
            assert_eq!(diff.new_sequence().as_ref(), Some(target));
        }
    }
}

#[test]
fn test_self_diff_is_unchanged() {
    for seq in sequences() {
        let diff = diff_sequences(&seq, &seq);
        assert!(!diff.has_changes());
        assert_eq!(diff.len(), seq.len());
    }
}

#[test]
fn test_merge_identity() {
    for seq in sequences() {
        let merged = three_way_merge(&seq, &seq, &seq);
        assert!(!merged.has_changes());
        assert!(!merged.has_conflicts());
    }
}

#[test]
fn test_one_sided_merge_yields_that_side() {
    let seqs = sequences();
    for base in seqs.iter().take(40) {
        for edited in seqs.iter().take(40) {
            let merged = three_way_merge(base, edited, base);
            assert!(!merged.has_conflicts());
            assert_eq!(merged.new_sequence().as_ref(), Some(edited));

            let merged = three_way_merge(base, base, edited);
            assert_eq!(merged.new_sequence().as_ref(), Some(edited));
        }
    }
}

#[test]
fn test_overlapping_text_edit_renders_one_conflict() {
    let base = split_lines("a\nb\nc\n");
    let one = split_lines("a\nX\nc\n");
    let two = split_lines("a\nY\nc\n");
    let merged = three_way_merge(&base, &one, &two);

    assert_eq!(merged.conflict_count(), 1);
    let conflict = merged
        .elements()
        .iter()
        .find_map(|e| match e {
            MergeElement::Conflict(c) => Some(c),
            MergeElement::Change(_) => None,
        })
        .unwrap();
    assert_eq!(conflict.anchor(), Some(1));

    let markers = ConflictMarkers::for_commits("one", "two");
    assert_eq!(
        merged.new_content(&markers),
        "a\n<<<<< one\nX\n=====\nY\n>>>>> two\nc\n"
    );
}
