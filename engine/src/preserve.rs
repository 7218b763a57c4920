//! Preserve-paths let a caller keep specific fields (typically ones the
//! platform mutates after creation, like an autoscaler-managed replica
//! count) out of the diff entirely.
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use tailor_model::ResourceKey;

use crate::Error;

/// Selector matches either every value (`*`) or one exact string.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Selector {
    Any,
    Exact(String),
}

impl Selector {
    fn matches(&self, value: &str) -> bool {
        match self {
            Selector::Any => true,
            Selector::Exact(s) => s == value,
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Any => write!(f, "*"),
            Selector::Exact(s) => write!(f, "{s}"),
        }
    }
}

/// PreservePath is one `Kind:Name:/json/pointer` (or `Kind:*:/ptr`, or
/// `*:*:/ptr`) rule from a `--ignore-path` flag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PreservePath {
    kind: Selector,
    name: Selector,
    pointer: String,
}

impl PreservePath {
    /// Matches reports whether a patch touching `path` on `key` should be
    /// dropped from the diff: the kind and name selectors must match, and
    /// `path` must be the pointer itself or nested under it.
    pub fn matches(&self, key: &ResourceKey, path: &str) -> bool {
        self.kind.matches(&key.kind)
            && self.name.matches(&key.name)
            && (path == self.pointer || path.starts_with(&format!("{}/", self.pointer)))
    }
}

impl FromStr for PreservePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(kind), Some(name), Some(pointer)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::MalformedPreservePath(s.to_string()));
        };
        if !pointer.starts_with('/') {
            return Err(Error::MalformedPreservePath(s.to_string()));
        }
        let kind = if kind == "*" {
            Selector::Any
        } else {
            Selector::Exact(tailor_model::canonical_kind(kind))
        };
        let name = if name == "*" {
            Selector::Any
        } else {
            Selector::Exact(name.to_string())
        };
        Ok(Self {
            kind,
            name,
            pointer: pointer.to_string(),
        })
    }
}

impl Display for PreservePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.name, self.pointer)
    }
}
