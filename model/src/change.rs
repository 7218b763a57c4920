//! Change and Changeset are the output of the diffing engine.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Resource, ResourceKey};

/// PatchOp is a single RFC 6902 JSON-Patch operation, restricted to the
/// add/remove/replace forms the structural diff emits. The wire
/// representation is the standard JSON Patch object shape, so a
/// `Vec<PatchOp>` serializes straight into the array `oc patch --type=json`
/// expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Add a value at a path that did not previously exist.
    Add {
        /// Path is an RFC 6901 JSON pointer.
        path: String,
        /// Value is the value being added.
        value: Value,
    },
    /// Remove the value at a path.
    Remove {
        /// Path is an RFC 6901 JSON pointer.
        path: String,
    },
    /// Replace the value at an existing path.
    Replace {
        /// Path is an RFC 6901 JSON pointer.
        path: String,
        /// Value is the replacement value.
        value: Value,
    },
}

impl PatchOp {
    /// Path returns the JSON pointer this operation targets.
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }
}

/// Action classifies what a [`Change`] does to bring current state in line
/// with desired state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Action {
    /// No difference between desired and current.
    Noop,
    /// Desired exists, current does not.
    Create,
    /// Both exist; a non-immutable patch brings current to desired.
    Update,
    /// Current exists, desired does not.
    Delete,
    /// Both exist; an immutable field differs, so current must be deleted
    /// and recreated.
    Recreate,
}

/// Change is one classified item in a [`Changeset`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Change {
    /// Action is the classification for this item.
    pub action: Action,
    /// Current is the resource as reported by the platform, if it exists.
    pub current: Option<Resource>,
    /// Desired is the resource as rendered from templates, if it exists.
    pub desired: Option<Resource>,
    /// Patches is the ordered, preserve-path-filtered patch list that turns
    /// `current` into `desired`. Empty for `Create`, `Delete`, and `Noop`.
    pub patches: Vec<PatchOp>,
    /// Rendered_diff is the human-readable rendering of this change,
    /// produced by the renderer the caller selected (text or json).
    pub rendered_diff: String,
}

impl Change {
    /// Key returns the `Kind/Name` identity this change applies to, taken
    /// from whichever side is present.
    pub fn key(&self) -> ResourceKey {
        self.current
            .as_ref()
            .or(self.desired.as_ref())
            .expect("a Change always has at least one side")
            .key()
    }
}

/// Changeset is the ordered set of buckets produced by one run of the
/// diffing engine.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Changeset {
    /// Noop holds resources that are already in sync.
    pub noop: Vec<Change>,
    /// Create holds resources that exist only in the desired state.
    pub create: Vec<Change>,
    /// Update holds resources needing a non-immutable patch.
    pub update: Vec<Change>,
    /// Delete holds resources that exist only in the current state.
    pub delete: Vec<Change>,
    /// Recreate holds resources whose patch touches an immutable field.
    pub recreate: Vec<Change>,
}

impl Changeset {
    /// Blank reports whether every mutation bucket is empty, i.e. there is
    /// no drift to converge.
    pub fn blank(&self) -> bool {
        self.create.is_empty()
            && self.update.is_empty()
            && self.delete.is_empty()
            && self.recreate.is_empty()
    }

    /// Len returns the total number of classified items across all buckets.
    pub fn len(&self) -> usize {
        self.noop.len() + self.create.len() + self.update.len() + self.delete.len() + self.recreate.len()
    }

    /// Is_empty reports whether the changeset classified nothing at all
    /// (distinct from [`Changeset::blank`], which ignores `noop`).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ignores_noop() {
        let mut cs = Changeset::default();
        assert!(cs.blank());
        cs.noop.push(Change {
            action: Action::Noop,
            current: None,
            desired: None,
            patches: vec![],
            rendered_diff: String::new(),
        });
        assert!(cs.blank());
        cs.update.push(Change {
            action: Action::Update,
            current: None,
            desired: None,
            patches: vec![],
            rendered_diff: String::new(),
        });
        assert!(!cs.blank());
    }

    #[test]
    fn patch_op_path_accessor() {
        let op = PatchOp::Replace {
            path: "/spec/ports/0/port".into(),
            value: Value::from(8080),
        };
        assert_eq!(op.path(), "/spec/ports/0/port");
    }
}
