//! Resource is the normalized in-memory representation of one API object.
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Source tags which inventory a [`Resource`] was loaded from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Source {
    /// Loaded from local templates.
    Desired,
    /// Loaded from the platform's current state.
    Current,
}

/// ResourceKey is the `Kind/Name` identity of a [`Resource`].
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Kind is the canonical resource kind, e.g. `Service`.
    pub kind: String,
    /// Name is the resource's name within its namespace.
    pub name: String,
}

impl ResourceKey {
    /// New constructs a key from a kind and a name.
    pub fn new<K: Into<String>, N: Into<String>>(kind: K, name: N) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Parse splits a `Kind/Name` or `Kind:Name` reference into a key.
    pub fn parse(s: &str) -> Result<Self> {
        let (kind, name) = s
            .split_once('/')
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| Error::MalformedKindName(s.to_string()))?;
        if kind.is_empty() || name.is_empty() {
            return Err(Error::MalformedKindName(s.to_string()));
        }
        Ok(Self::new(kind, name))
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Resource is a normalized, single API object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resource {
    /// Kind is the canonical resource kind.
    pub kind: String,
    /// Name is the resource's name.
    pub name: String,
    /// Labels attached to the resource.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations attached to the resource.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Payload is the canonical tree for the full object (including
    /// `metadata`, `spec`/`data`, etc). `kind`/`name`/`labels`/`annotations`
    /// above are denormalized out of this tree for convenient access; the
    /// payload remains the source of truth for diffing.
    pub payload: Value,
    /// Source records which inventory this resource came from.
    pub source: Source,
}

impl Resource {
    /// Key returns this resource's `Kind/Name` identity.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind.clone(), self.name.clone())
    }

    /// From_value builds a Resource from a single parsed JSON/YAML object,
    /// tagging it with the given provenance. The kind, name, labels, and
    /// annotations are read out of the standard `kind`/`metadata` fields.
    pub fn from_value(v: Value, source: Source) -> Result<Self> {
        let kind = v
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedKindName("<missing kind>".into()))?
            .to_string();
        let meta = v.get("metadata").cloned().unwrap_or(Value::Null);
        let name = meta
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedKindName(format!("{kind}/<missing name>")))?
            .to_string();
        let labels = meta
            .get("labels")
            .and_then(map_of_strings)
            .unwrap_or_default();
        let annotations = meta
            .get("annotations")
            .and_then(map_of_strings)
            .unwrap_or_default();
        Ok(Self {
            kind,
            name,
            labels,
            annotations,
            payload: v,
            source,
        })
    }
}

fn map_of_strings(v: &Value) -> Option<BTreeMap<String, String>> {
    v.as_object().map(|obj| {
        obj.iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()
    })
}

/// ResourceList is an ordered, `Kind/Name`-addressable collection of
/// resources built once per reconcile. It is immutable once constructed;
/// mutation happens by building a new list.
#[derive(Clone, Debug, Default)]
pub struct ResourceList {
    items: BTreeMap<ResourceKey, Resource>,
}

impl ResourceList {
    /// New builds an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// From_resources builds a list from an iterator of resources.
    /// `Kind/Name` is the identity, so duplicates are rejected.
    pub fn from_resources<I: IntoIterator<Item = Resource>>(iter: I) -> Result<Self> {
        let mut items = BTreeMap::new();
        for r in iter {
            let key = r.key();
            if items.insert(key.clone(), r).is_some() {
                return Err(Error::DuplicateResource(key));
            }
        }
        Ok(Self { items })
    }

    /// Get looks up a resource by key.
    pub fn get(&self, key: &ResourceKey) -> Option<&Resource> {
        self.items.get(key)
    }

    /// Keys returns every identity present in the list, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.items.keys()
    }

    /// Iter returns the resources in `Kind/Name` sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.items.values()
    }

    /// Len returns the number of resources in the list.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Is_empty reports whether the list holds no resources.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn svc(name: &str) -> Resource {
        Resource::from_value(
            json!({"kind": "Service", "metadata": {"name": name}}),
            Source::Desired,
        )
        .unwrap()
    }

    #[test]
    fn duplicate_identity_rejected() {
        let err = ResourceList::from_resources([svc("pi"), svc("pi")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(_)));
    }

    #[test]
    fn key_parses_slash_and_colon() {
        assert_eq!(
            ResourceKey::parse("Service/pi").unwrap(),
            ResourceKey::new("Service", "pi")
        );
        assert_eq!(
            ResourceKey::parse("bc:bar").unwrap(),
            ResourceKey::new("bc", "bar")
        );
        assert!(ResourceKey::parse("nope").is_err());
    }

    #[test]
    fn list_is_sorted_by_key() {
        let list = ResourceList::from_resources([svc("zeta"), svc("alpha")]).unwrap();
        let names: Vec<_> = list.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
