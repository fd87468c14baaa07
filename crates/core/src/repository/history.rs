//! Commit DAG traversal.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::errors::RepositoryError;
use crate::objects::{Commit, Object, ObjectId};
use crate::store::ObjectStore;

/// Breadth-first walk over a commit and its ancestors.
///
/// Commits are yielded in visitation order, not by date. Each commit is
/// yielded once even when several paths in the DAG reach it.
pub struct History<'a, S: ObjectStore> {
    store: &'a S,
    queue: VecDeque<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl<'a, S: ObjectStore> History<'a, S> {
    pub fn new(store: &'a S, start: impl Into<ObjectId>) -> Self {
        let start = start.into();
        let mut seen = HashSet::new();
        seen.insert(start.clone());
        Self {
            store,
            queue: VecDeque::from([start]),
            seen,
        }
    }

    fn load(&self, id: &str) -> Result<Commit, RepositoryError> {
        match self.store.fetch(id)? {
            Some(Object::Commit(commit)) => Ok(commit),
            _ => Err(RepositoryError::MissingObject {
                object_type: "commit".into(),
                id: id.to_string(),
            }),
        }
    }
}

impl<S: ObjectStore> Iterator for History<'_, S> {
    type Item = Result<Commit, RepositoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        let commit = match self.load(&id) {
            Ok(commit) => commit,
            Err(e) => {
                // Nothing behind a missing commit can be reached.
                self.queue.clear();
                return Some(Err(e));
            }
        };
        for parent in commit.parents() {
            if self.seen.insert(parent.clone()) {
                self.queue.push_back(parent.clone());
            }
        }
        Some(Ok(commit))
    }
}

/// Nearest commit reachable from both `one` and `two`.
///
/// Every ancestor of `two` (itself included) is collected first, then the
/// ancestors of `one` are walked breadth-first and the first member of that
/// set wins. With several equally near candidates the winner is the one
/// discovered first from `one`.
pub fn common_ancestor<S: ObjectStore>(
    store: &S,
    one: &str,
    two: &str,
) -> Result<Option<Commit>, RepositoryError> {
    let mut reachable = HashSet::new();
    for commit in History::new(store, two) {
        reachable.insert(commit?.id().to_string());
    }

    for commit in History::new(store, one) {
        let commit = commit?;
        if reachable.contains(commit.id()) {
            debug!(one, two, ancestor = commit.id(), "found common ancestor");
            return Ok(Some(commit));
        }
    }
    debug!(one, two, "no common ancestor");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Tree;
    use crate::store::MemoryObjectStore;
    use chrono::{TimeZone, Utc};

    fn commit(store: &mut MemoryObjectStore, message: &str, parents: &[&ObjectId]) -> ObjectId {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let parents = parents.iter().map(|p| (*p).clone()).collect();
        store
            .put(Commit::new(message, Tree::empty().id(), parents, "tester", date))
            .unwrap()
    }

    /// A <- B, A <- C, {B, C} <- D
    fn diamond() -> (MemoryObjectStore, [ObjectId; 4]) {
        let mut store = MemoryObjectStore::new();
        let a = commit(&mut store, "A", &[]);
        let b = commit(&mut store, "B", &[&a]);
        let c = commit(&mut store, "C", &[&a]);
        let d = commit(&mut store, "D", &[&b, &c]);
        (store, [a, b, c, d])
    }

    #[test]
    fn test_history_is_breadth_first_and_deduplicated() {
        let (store, [a, b, c, d]) = diamond();
        let ids: Vec<ObjectId> = History::new(&store, d.clone())
            .map(|c| c.unwrap().id().to_string())
            .collect();
        assert_eq!(ids, vec![d, b, c, a]);
    }

    #[test]
    fn test_diamond_common_ancestor() {
        let (store, [a, b, c, _]) = diamond();
        let ancestor = common_ancestor(&store, &b, &c).unwrap().unwrap();
        assert_eq!(ancestor.id(), a);
    }

    #[test]
    fn test_ancestor_of_descendant_is_itself() {
        let (store, [_, b, _, d]) = diamond();
        let ancestor = common_ancestor(&store, &d, &b).unwrap().unwrap();
        assert_eq!(ancestor.id(), b);
    }

    #[test]
    fn test_unrelated_roots_have_no_ancestor() {
        let mut store = MemoryObjectStore::new();
        let x = commit(&mut store, "X", &[]);
        let y = commit(&mut store, "Y", &[]);
        assert!(common_ancestor(&store, &x, &y).unwrap().is_none());
    }

    #[test]
    fn test_criss_cross_tie_breaks_by_discovery_order() {
        // Two merge bases, B and C, each reachable from both tips.
        let (mut store, [_, b, c, _]) = diamond();
        let one = commit(&mut store, "one", &[&b, &c]);
        let two = commit(&mut store, "two", &[&c, &b]);
        let ancestor = common_ancestor(&store, &one, &two).unwrap().unwrap();
        assert_eq!(ancestor.id(), b);
        let ancestor = common_ancestor(&store, &two, &one).unwrap().unwrap();
        assert_eq!(ancestor.id(), c);
    }

    #[test]
    fn test_missing_parent_is_reported() {
        let mut store = MemoryObjectStore::new();
        let ghost = "f".repeat(64);
        let tip = commit(&mut store, "tip", &[&ghost]);
        let results: Vec<_> = History::new(&store, tip).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(RepositoryError::MissingObject { .. })));
    }
}
