//! Mutable named pointers (branches and `HEAD`).

use serde::{Deserialize, Serialize};

use super::{ContentAddressed, ObjectId, ObjectType};

/// Label name that tracks the checked-out branch or commit.
pub const HEAD: &str = "HEAD";

/// A name pointing at a commit id or at another label's name.
///
/// Labels are keyed by name rather than by content hash; writing a label
/// with an existing name replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    name: String,
    reference: ObjectId,
}

impl Label {
    pub fn new(name: impl Into<String>, reference: impl Into<ObjectId>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl ContentAddressed for Label {
    fn object_type(&self) -> ObjectType {
        ObjectType::Label
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        format!("{} -> {}", self.name, self.reference).into_bytes()
    }

    fn compute_id(&self) -> ObjectId {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_id_is_its_name() {
        let label = Label::new("main", "abc");
        assert_eq!(label.compute_id(), "main");
        assert_eq!(label.reference(), "abc");
    }
}
