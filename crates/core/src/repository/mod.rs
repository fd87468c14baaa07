//! Repository orchestrator.
//!
//! A [`Repository`] ties an [`ObjectStore`] and a [`StagingArea`] together
//! and implements the workflow on top of them: committing the staging area,
//! moving labels, checking out and restoring content, and merging two
//! commits into the staging area.
//!
//! Merging proceeds per file:
//!
//! 1. Resolve the common ancestor of the two commits (an empty tree if none).
//! 2. Flatten the three trees into `path -> blob id` maps.
//! 3. Three-way merge the line sequences of every path in their union.
//! 4. Where a merged file would sit at the path of a merged directory, drop
//!    the file and report it as conflicted.
//! 5. Write the materialized results (or delete the paths that end up empty).
//!
//! Divergent content is never an error: conflicts come back as data in the
//! [`MergeReport`].

pub mod history;

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ArborConfig;
use crate::diff::split_lines;
use crate::errors::{ObjectError, RepositoryError};
use crate::merge::three_way_merge;
use crate::objects::{is_object_id, Blob, Commit, Label, Object, ObjectId, Tree, HEAD};
use crate::staging::{join_path, normalize_path, StagingArea};
use crate::store::ObjectStore;

pub use history::{common_ancestor, History};

/// Longest label chain followed before giving up.
const MAX_LABEL_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of [`Repository::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Common ancestor the merge was computed against.
    pub ancestor: Option<ObjectId>,
    /// Paths that merged cleanly and differ from the ancestor.
    pub merged: Vec<String>,
    /// Paths written with conflict markers.
    pub conflicted: Vec<String>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.conflicted.is_empty()
    }
}

/// Staging area compared against the HEAD tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl Status {
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Object store plus staging area plus configuration.
pub struct Repository<S: ObjectStore, A: StagingArea> {
    store: S,
    staging: A,
    config: ArborConfig,
}

impl<S: ObjectStore, A: StagingArea> Repository<S, A> {
    /// Open a repository, creating the `HEAD` label if it does not exist yet.
    ///
    /// A fresh `HEAD` points at the configured default branch, which stays
    /// unborn until the first commit.
    pub fn init(mut store: S, staging: A, config: ArborConfig) -> Result<Self, RepositoryError> {
        if !store.exists(HEAD)? {
            let branch = config.repository.default_branch.clone();
            info!(branch = %branch, "initializing HEAD");
            store.put(Label::new(HEAD, branch))?;
        }
        Ok(Self {
            store,
            staging,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn staging(&self) -> &A {
        &self.staging
    }

    pub fn staging_mut(&mut self) -> &mut A {
        &mut self.staging
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, A, ArborConfig) {
        (self.store, self.staging, self.config)
    }

    // -- references ---------------------------------------------------------

    /// The `HEAD` label. Falls back to the default branch if it was removed
    /// from the store behind our back.
    pub fn head(&self) -> Result<Label, RepositoryError> {
        match self.store.fetch(HEAD)? {
            Some(Object::Label(label)) => Ok(label),
            Some(other) => Err(ObjectError::UnknownReference(format!(
                "HEAD is a {}, not a label",
                other.object_type()
            ))
            .into()),
            None => {
                warn!("HEAD label missing, assuming the default branch");
                Ok(Label::new(HEAD, self.config.repository.default_branch.clone()))
            }
        }
    }

    /// Branch `HEAD` points at, or `None` when `HEAD` is detached.
    pub fn current_branch(&self) -> Result<Option<String>, RepositoryError> {
        let head = self.head()?;
        if is_object_id(head.reference()) {
            Ok(None)
        } else {
            Ok(Some(head.reference().to_string()))
        }
    }

    /// Commit `HEAD` resolves to, or `None` on an unborn branch.
    pub fn head_commit(&self) -> Result<Option<Commit>, RepositoryError> {
        self.resolve_commit(HEAD)
    }

    /// Follow labels from `reference` to a commit.
    ///
    /// Returns `Ok(None)` when nothing is stored under a key along the way.
    /// Fails with `UnknownReference` when the chain ends at a blob or tree,
    /// or is longer than 32 labels (which also catches cycles).
    pub fn resolve_commit(&self, reference: &str) -> Result<Option<Commit>, RepositoryError> {
        let mut key = reference.to_string();
        for _ in 0..MAX_LABEL_DEPTH {
            match self.store.fetch(&key)? {
                None => return Ok(None),
                Some(Object::Commit(commit)) => return Ok(Some(commit)),
                Some(Object::Label(label)) => key = label.reference().to_string(),
                Some(other) => {
                    return Err(ObjectError::UnknownReference(format!(
                        "{} resolves to a {}, not a commit",
                        reference,
                        other.object_type()
                    ))
                    .into())
                }
            }
        }
        Err(ObjectError::UnknownReference(format!(
            "{} exceeds {} levels of label indirection",
            reference, MAX_LABEL_DEPTH
        ))
        .into())
    }

    /// Like [`resolve_commit`](Self::resolve_commit), but absence is an error.
    pub fn require_commit(&self, reference: &str) -> Result<Commit, RepositoryError> {
        self.resolve_commit(reference)?
            .ok_or_else(|| RepositoryError::CommitNotFound(reference.to_string()))
    }

    /// Create a label `name` at the `HEAD` commit.
    pub fn create_branch(&mut self, name: &str) -> Result<Label, RepositoryError> {
        validate_branch_name(name)?;
        if self.store.exists(name)? {
            return Err(RepositoryError::InvalidBranchName {
                name: name.to_string(),
                detail: "a branch with that name already exists".into(),
            });
        }
        let head = self.head_commit()?.ok_or(RepositoryError::NoCommits)?;
        let label = Label::new(name, head.id());
        self.store.put(label.clone())?;
        info!(branch = name, commit = head.id(), "created branch");
        Ok(label)
    }

    /// Point whatever `HEAD` designates at `commit_id`: the current branch
    /// label, or `HEAD` itself when detached.
    fn advance_head(&mut self, commit_id: &str) -> Result<(), RepositoryError> {
        match self.current_branch()? {
            Some(branch) => {
                debug!(branch = %branch, commit = commit_id, "advancing branch");
                self.store.put(Label::new(branch, commit_id))?;
            }
            None => {
                debug!(commit = commit_id, "advancing detached HEAD");
                self.store.put(Label::new(HEAD, commit_id))?;
            }
        }
        Ok(())
    }

    // -- objects ------------------------------------------------------------

    fn fetch_tree(&self, id: &str) -> Result<Tree, RepositoryError> {
        self.store
            .fetch(id)?
            .and_then(Object::into_tree)
            .ok_or_else(|| RepositoryError::MissingObject {
                object_type: "tree".into(),
                id: id.to_string(),
            })
    }

    fn fetch_blob(&self, id: &str) -> Result<Blob, RepositoryError> {
        self.store
            .fetch(id)?
            .and_then(Object::into_blob)
            .ok_or_else(|| RepositoryError::MissingObject {
                object_type: "blob".into(),
                id: id.to_string(),
            })
    }

    /// Every file under `tree_id`, keyed by its `/`-separated path.
    pub fn flatten_tree(&self, tree_id: &str) -> Result<BTreeMap<String, ObjectId>, RepositoryError> {
        let mut out = BTreeMap::new();
        self.flatten_into(tree_id, "", &mut out)?;
        Ok(out)
    }

    fn flatten_into(
        &self,
        tree_id: &str,
        prefix: &str,
        out: &mut BTreeMap<String, ObjectId>,
    ) -> Result<(), RepositoryError> {
        let tree = self.fetch_tree(tree_id)?;
        for (name, blob_id) in tree.files() {
            out.insert(join_path(prefix, name), blob_id.clone());
        }
        for (name, subtree_id) in tree.trees() {
            self.flatten_into(subtree_id, &join_path(prefix, name), out)?;
        }
        Ok(())
    }

    /// Flattened tree of a commit.
    fn commit_files(&self, commit: &Commit) -> Result<BTreeMap<String, ObjectId>, RepositoryError> {
        self.flatten_tree(commit.tree_id())
    }

    // -- staging ------------------------------------------------------------

    /// Every staged file and its content.
    fn staged_files(&self) -> Result<BTreeMap<String, String>, RepositoryError> {
        let mut out = BTreeMap::new();
        let mut pending = vec![String::new()];
        while let Some(dir) = pending.pop() {
            for name in self.staging.list_files(&dir)? {
                let path = join_path(&dir, &name);
                let content = self.staging.read(&path)?;
                out.insert(path, content);
            }
            for name in self.staging.list_dirs(&dir)? {
                pending.push(join_path(&dir, &name));
            }
        }
        Ok(out)
    }

    /// Store the staging area as blobs and trees, bottom-up, and return the
    /// root tree. Empty directories are not recorded.
    pub fn write_tree(&mut self) -> Result<ObjectId, RepositoryError> {
        let tree = self.write_dir("")?;
        debug!(tree = tree.id(), "wrote tree");
        Ok(tree.id().to_string())
    }

    fn write_dir(&mut self, dir: &str) -> Result<Tree, RepositoryError> {
        let mut files = Vec::new();
        for name in self.staging.list_files(dir)? {
            let content = self.staging.read(&join_path(dir, &name))?;
            let blob_id = self.store.put(Blob::new(content))?;
            files.push((name, blob_id));
        }

        let mut trees = Vec::new();
        for name in self.staging.list_dirs(dir)? {
            let subtree = self.write_dir(&join_path(dir, &name))?;
            if !subtree.is_empty() {
                trees.push((name, subtree.id().to_string()));
            }
        }

        let tree = Tree::new(files, trees)?;
        self.store.put(tree.clone())?;
        Ok(tree)
    }

    /// Replace the staging contents with `files`, removing anything else.
    fn replace_staging(&mut self, files: &BTreeMap<String, ObjectId>) -> Result<(), RepositoryError> {
        for path in self.staged_files()?.keys() {
            if !files.contains_key(path) {
                self.staging.delete(path)?;
            }
        }
        for (path, blob_id) in files {
            let blob = self.fetch_blob(blob_id)?;
            self.staging.write(path, blob.content())?;
        }
        Ok(())
    }

    // -- workflow -----------------------------------------------------------

    /// Commit the staging area on top of `HEAD`.
    pub fn commit(&mut self, message: &str) -> Result<Commit, RepositoryError> {
        let parents = self
            .head_commit()?
            .map(|c| vec![c.id().to_string()])
            .unwrap_or_default();
        self.record_commit(message, parents)
    }

    /// Commit the staging area with parents `[HEAD, other]`.
    pub fn commit_merge(&mut self, message: &str, other: &str) -> Result<Commit, RepositoryError> {
        let head = self.head_commit()?.ok_or(RepositoryError::NoCommits)?;
        let other = self.require_commit(other)?;
        self.record_commit(message, vec![head.id().to_string(), other.id().to_string()])
    }

    fn record_commit(
        &mut self,
        message: &str,
        parents: Vec<ObjectId>,
    ) -> Result<Commit, RepositoryError> {
        let tree_id = self.write_tree()?;
        let commit = Commit::new(
            message,
            tree_id,
            parents,
            self.config.author.signature(),
            Utc::now(),
        );
        self.store.put(commit.clone())?;
        self.advance_head(commit.id())?;
        info!(
            commit = commit.id(),
            parents = commit.parents().len(),
            summary = commit.summary(),
            "recorded commit"
        );
        Ok(commit)
    }

    /// Make the staging area match `reference` and move `HEAD` to it.
    ///
    /// `HEAD` follows a branch when `reference` names a label and is
    /// detached at the commit otherwise.
    pub fn checkout(&mut self, reference: &str) -> Result<Commit, RepositoryError> {
        let commit = self.require_commit(reference)?;
        let files = self.commit_files(&commit)?;
        self.replace_staging(&files)?;

        if reference != HEAD {
            let target = match self.store.fetch(reference)? {
                Some(Object::Label(_)) => reference.to_string(),
                _ => commit.id().to_string(),
            };
            self.store.put(Label::new(HEAD, target))?;
        }
        info!(reference, commit = commit.id(), files = files.len(), "checked out");
        Ok(commit)
    }

    /// Write the version of `path` recorded in `reference` into staging.
    pub fn restore(&mut self, reference: &str, path: &str) -> Result<(), RepositoryError> {
        let commit = self.require_commit(reference)?;
        let path = normalize_path(path)?;
        let files = self.commit_files(&commit)?;
        let blob_id = files.get(&path).ok_or_else(|| RepositoryError::PathNotFound {
            path: path.clone(),
            commit: commit.id().to_string(),
        })?;
        let blob = self.fetch_blob(blob_id)?;
        self.staging.write(&path, blob.content())?;
        debug!(path = %path, commit = commit.id(), "restored file");
        Ok(())
    }

    /// Compare the staging area against the `HEAD` tree.
    pub fn status(&self) -> Result<Status, RepositoryError> {
        let committed = match self.head_commit()? {
            Some(commit) => self.commit_files(&commit)?,
            None => BTreeMap::new(),
        };
        let staged = self.staged_files()?;

        let mut status = Status::default();
        for (path, content) in &staged {
            match committed.get(path) {
                None => status.added.push(path.clone()),
                Some(blob_id) if Blob::new(content.as_str()).id() != blob_id.as_str() => {
                    status.modified.push(path.clone())
                }
                Some(_) => {}
            }
        }
        status.deleted = committed
            .keys()
            .filter(|path| !staged.contains_key(*path))
            .cloned()
            .collect();
        Ok(status)
    }

    /// Ancestors of `reference`, breadth-first, starting with itself.
    pub fn history(&self, reference: &str) -> Result<History<'_, S>, RepositoryError> {
        let start = self.require_commit(reference)?;
        Ok(History::new(&self.store, start.id()))
    }

    /// Nearest commit reachable from both references.
    pub fn common_ancestor(&self, one: &str, two: &str) -> Result<Option<Commit>, RepositoryError> {
        let one = self.require_commit(one)?;
        let two = self.require_commit(two)?;
        common_ancestor(&self.store, one.id(), two.id())
    }

    /// Three-way merge commit `two` into commit `one`, writing the results
    /// into the staging area.
    pub fn merge(&mut self, one: &str, two: &str) -> Result<MergeReport, RepositoryError> {
        let one = self.require_commit(one)?;
        let two = self.require_commit(two)?;
        let ancestor = common_ancestor(&self.store, one.id(), two.id())?;
        info!(
            one = one.id(),
            two = two.id(),
            ancestor = ancestor.as_ref().map(|c| c.id()),
            "merging commits"
        );

        let base_files = match &ancestor {
            Some(commit) => self.commit_files(commit)?,
            None => BTreeMap::new(),
        };
        let one_files = self.commit_files(&one)?;
        let two_files = self.commit_files(&two)?;

        let paths: BTreeSet<&String> = base_files
            .keys()
            .chain(one_files.keys())
            .chain(two_files.keys())
            .collect();
        let markers = self.config.merge.markers(one.id(), two.id());

        let mut outcomes: BTreeMap<String, PathMerge> = BTreeMap::new();
        for path in paths {
            let base = self.blob_lines(base_files.get(path))?;
            let ours = self.blob_lines(one_files.get(path))?;
            let theirs = self.blob_lines(two_files.get(path))?;

            let diff = three_way_merge(&base, &ours, &theirs);
            let state = if diff.has_conflicts() {
                debug!(path = %path, conflicts = diff.conflict_count(), "conflicted");
                PathState::Conflicted
            } else if diff.has_changes() {
                debug!(path = %path, "merged");
                PathState::Merged
            } else {
                PathState::Untouched
            };
            outcomes.insert(
                path.clone(),
                PathMerge {
                    state,
                    content: diff.new_content(&markers),
                },
            );
        }

        // A file cannot survive where the merge leaves a directory.
        for path in shadowed_files(&outcomes) {
            warn!(path = %path, "file collides with a directory of the same name, keeping the directory");
            if let Some(outcome) = outcomes.get_mut(&path) {
                outcome.state = PathState::Conflicted;
                outcome.content.clear();
            }
        }

        let mut report = MergeReport {
            ancestor: ancestor.as_ref().map(|c| c.id().to_string()),
            ..MergeReport::default()
        };
        for (path, outcome) in &outcomes {
            match outcome.state {
                PathState::Untouched => {}
                PathState::Merged => report.merged.push(path.clone()),
                PathState::Conflicted => report.conflicted.push(path.clone()),
            }
        }

        // Deletions go first: a deleted file may sit where a new directory goes.
        for (path, outcome) in &outcomes {
            if outcome.state != PathState::Untouched
                && outcome.content.is_empty()
                && self.staging.has(path)?
            {
                self.staging.delete(path)?;
            }
        }
        for (path, outcome) in &outcomes {
            if outcome.state != PathState::Untouched && !outcome.content.is_empty() {
                self.staging.write(path, &outcome.content)?;
            }
        }

        info!(
            merged = report.merged.len(),
            conflicted = report.conflicted.len(),
            "merge finished"
        );
        Ok(report)
    }

    /// Lines of a blob, or nothing for a path absent on that side.
    fn blob_lines(&self, blob_id: Option<&ObjectId>) -> Result<Vec<String>, RepositoryError> {
        match blob_id {
            Some(id) => Ok(split_lines(self.fetch_blob(id)?.content())),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathState {
    Untouched,
    Merged,
    Conflicted,
}

/// Merged content of one path, computed before anything is written.
struct PathMerge {
    state: PathState,
    content: String,
}

/// Paths the merge would leave as files while other files sit beneath them.
fn shadowed_files(outcomes: &BTreeMap<String, PathMerge>) -> Vec<String> {
    let files: BTreeSet<&str> = outcomes
        .iter()
        .filter(|(_, outcome)| !outcome.content.is_empty())
        .map(|(path, _)| path.as_str())
        .collect();
    files
        .iter()
        .filter(|path| {
            let dir = format!("{}/", path);
            files
                .range::<str, _>((Bound::Included(dir.as_str()), Bound::Unbounded))
                .next()
                .is_some_and(|next| next.starts_with(&dir))
        })
        .map(|path| path.to_string())
        .collect()
}

/// Reject names that would collide with `HEAD`, look like object ids, or
/// cannot be typed on a command line.
pub fn validate_branch_name(name: &str) -> Result<(), RepositoryError> {
    let reject = |detail: &str| {
        Err(RepositoryError::InvalidBranchName {
            name: name.to_string(),
            detail: detail.to_string(),
        })
    };
    if name.is_empty() {
        return reject("branch name must not be empty");
    }
    if name.chars().any(char::is_whitespace) {
        return reject("branch name must not contain whitespace");
    }
    if name == HEAD {
        return reject("HEAD is reserved");
    }
    if is_object_id(name) {
        return reject("branch name must not look like an object id");
    }
    Ok(())
}
