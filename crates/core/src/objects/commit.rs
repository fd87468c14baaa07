//! Snapshots in the history DAG.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{check_id, ContentAddressed, ObjectId, ObjectType};
use crate::errors::ObjectError;

/// A commit names exactly one root tree and zero or more parents.
///
/// No parents marks a root commit, one a normal commit, two or more a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    id: ObjectId,
    message: String,
    tree_id: ObjectId,
    parents: Vec<ObjectId>,
    author: String,
    date: DateTime<Utc>,
}

/// Stored shape of a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: ObjectId,
    pub message: String,
    pub tree_id: ObjectId,
    #[serde(default)]
    pub parents: Vec<ObjectId>,
    pub author: String,
    pub date: DateTime<Utc>,
}

impl Commit {
    pub fn new(
        message: impl Into<String>,
        tree_id: impl Into<ObjectId>,
        parents: Vec<ObjectId>,
        author: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        let mut commit = Self {
            id: ObjectId::new(),
            message: message.into(),
            tree_id: tree_id.into(),
            parents,
            author: author.into(),
            date,
        };
        commit.id = commit.compute_id();
        commit
    }

    /// Rebuild a commit whose id is already known, verifying it.
    pub fn with_id(
        id: impl Into<ObjectId>,
        message: impl Into<String>,
        tree_id: impl Into<ObjectId>,
        parents: Vec<ObjectId>,
        author: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Result<Self, ObjectError> {
        let id = id.into();
        let commit = Self::new(message, tree_id, parents, author, date);
        check_id(ObjectType::Commit, &id, &commit.id)?;
        Ok(commit)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl ContentAddressed for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = format!("tree {}\n", self.tree_id);
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author));
        out.push_str(&format!(
            "date {}\n",
            self.date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        ));
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }
}

impl TryFrom<CommitRecord> for Commit {
    type Error = ObjectError;

    fn try_from(r: CommitRecord) -> Result<Self, Self::Error> {
        Self::with_id(r.id, r.message, r.tree_id, r.parents, r.author, r.date)
    }
}

impl From<&Commit> for CommitRecord {
    fn from(c: &Commit) -> Self {
        Self {
            id: c.id.clone(),
            message: c.message.clone(),
            tree_id: c.tree_id.clone(),
            parents: c.parents.clone(),
            author: c.author.clone(),
            date: c.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_identical_fields_identical_id() {
        let a = Commit::new("msg", "t", vec![], "me", date());
        let b = Commit::new("msg", "t", vec![], "me", date());
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_parent_order_matters() {
        let a = Commit::new("m", "t", vec!["p1".into(), "p2".into()], "me", date());
        let b = Commit::new("m", "t", vec!["p2".into(), "p1".into()], "me", date());
        assert_ne!(a.id(), b.id());
        assert!(a.is_merge());
    }

    #[test]
    fn test_with_id_rejects_altered_message() {
        let c = Commit::new("original", "t", vec![], "me", date());
        let err = Commit::with_id(c.id(), "changed", "t", vec![], "me", date()).unwrap_err();
        assert!(matches!(err, ObjectError::InvalidObject { .. }));
    }

    #[test]
    fn test_record_round_trip_with_subsecond_date() {
        let when = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let c = Commit::new("m", "t", vec!["p".into()], "me", when);
        let json = serde_json::to_string(&CommitRecord::from(&c)).unwrap();
        let record: CommitRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(Commit::try_from(record).unwrap(), c);
    }

    #[test]
    fn test_summary() {
        let c = Commit::new("first line\n\nbody", "t", vec![], "me", date());
        assert_eq!(c.summary(), "first line");
    }
}
