//! Filter selects which resources participate in a reconcile.
use std::collections::{BTreeMap, BTreeSet};

use crate::{Error, Resource, ResourceKey, Result};

/// KIND_ALIASES maps short command-line aliases to canonical resource
/// kinds.
const KIND_ALIASES: &[(&str, &str)] = &[
    ("dc", "DeploymentConfig"),
    ("bc", "BuildConfig"),
    ("svc", "Service"),
    ("is", "ImageStream"),
    ("pvc", "PersistentVolumeClaim"),
    ("cm", "ConfigMap"),
    ("sa", "ServiceAccount"),
    ("rb", "RoleBinding"),
];

/// KNOWN_KINDS is the closed set of resource kinds this tool manages when
/// no explicit kind restriction is given.
pub const KNOWN_KINDS: &[&str] = &[
    "BuildConfig",
    "ConfigMap",
    "DeploymentConfig",
    "ImageStream",
    "PersistentVolumeClaim",
    "RoleBinding",
    "Route",
    "Secret",
    "Service",
    "ServiceAccount",
];

/// Known_kinds returns [`KNOWN_KINDS`] as an owned set, the shape
/// [`Filter::with_kinds`] validates user-supplied kind tokens against.
pub fn known_kinds() -> BTreeSet<String> {
    KNOWN_KINDS.iter().map(|s| (*s).to_string()).collect()
}

/// Canonical_kind resolves a possibly-aliased kind token to its canonical
/// form. Unknown tokens are returned unchanged; callers that need to reject
/// unknown kinds should consult a closed set instead (see
/// [`Filter::with_kinds`]).
pub fn canonical_kind(token: &str) -> String {
    KIND_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(token))
        .map(|(_, canon)| (*canon).to_string())
        .unwrap_or_else(|| token.to_string())
}

/// Filter selects the resources participating in a reconcile: an optional
/// kind restriction, an optional single `Kind/Name`, required labels, and
/// an exclude list. All conditions are ANDed.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    kinds: BTreeSet<String>,
    name: Option<ResourceKey>,
    label: BTreeMap<String, String>,
    exclude: BTreeSet<ExcludeRule>,
}

/// ExcludeRule is one entry of a Filter's exclude list: an exact kind, an
/// exact `Kind/Name`, or a `key=value` label match.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum ExcludeRule {
    Kind(String),
    KindName(ResourceKey),
    Label(String, String),
}

impl Filter {
    /// New builds an empty filter, which matches every resource of the
    /// caller's default kind set.
    pub fn new() -> Self {
        Self::default()
    }

    /// With_kinds restricts the filter to the given kind set (aliases are
    /// resolved to canonical form; unknown tokens outside the known set are
    /// rejected with [`Error::UnknownKind`]).
    pub fn with_kinds<I, S>(mut self, known: &BTreeSet<String>, kinds: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in kinds {
            let kind = canonical_kind(token.as_ref());
            if !known.is_empty() && !known.contains(&kind) {
                return Err(Error::UnknownKind(token.as_ref().to_string()));
            }
            self.kinds.insert(kind);
        }
        Ok(self)
    }

    /// With_name restricts the filter to a single `Kind/Name` reference.
    /// The kind half may be an alias (`svc/pi`).
    pub fn with_name(mut self, name: &str) -> Result<Self> {
        let key = ResourceKey::parse(name)?;
        self.name = Some(ResourceKey::new(canonical_kind(&key.kind), key.name));
        Ok(self)
    }

    /// With_label adds required `key=value` label matches, parsed from a
    /// comma-separated `k=v[,k=v]*` string.
    pub fn with_label(mut self, selector: &str) -> Result<Self> {
        for pair in selector.split(',').filter(|s| !s.is_empty()) {
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| Error::MalformedLabelSelector(selector.to_string()))?;
            self.label.insert(k.to_string(), v.to_string());
        }
        Ok(self)
    }

    /// Exclude_kind excludes every resource of the given kind.
    pub fn exclude_kind(mut self, kind: &str) -> Self {
        self.exclude.insert(ExcludeRule::Kind(canonical_kind(kind)));
        self
    }

    /// Exclude_name excludes a single `Kind/Name` reference.
    pub fn exclude_name(mut self, name: &str) -> Result<Self> {
        let key = ResourceKey::parse(name)?;
        self.exclude.insert(ExcludeRule::KindName(ResourceKey::new(
            canonical_kind(&key.kind),
            key.name,
        )));
        Ok(self)
    }

    /// Exclude_label excludes every resource carrying the `key=value` label.
    pub fn exclude_label(mut self, key: &str, value: &str) -> Self {
        self.exclude
            .insert(ExcludeRule::Label(key.to_string(), value.to_string()));
        self
    }

    /// Selected_kinds returns the kinds a current-state export should ask
    /// the platform for: the single named resource's kind, the restricted
    /// kind set, or the full known set when the filter names neither.
    pub fn selected_kinds(&self) -> Vec<String> {
        if let Some(name) = &self.name {
            return vec![name.kind.clone()];
        }
        if !self.kinds.is_empty() {
            return self.kinds.iter().cloned().collect();
        }
        KNOWN_KINDS.iter().map(|s| (*s).to_string()).collect()
    }

    /// Accept reports whether `r` participates in this reconcile. The name
    /// restriction (or, failing that, the kind set), every required label,
    /// and the exclude list must all agree.
    pub fn accept(&self, r: &Resource) -> bool {
        if let Some(name) = &self.name {
            if r.key() != *name {
                return false;
            }
        } else if !self.kinds.is_empty() && !self.kinds.contains(&r.kind) {
            return false;
        }

        for (k, v) in &self.label {
            if r.labels.get(k) != Some(v) {
                return false;
            }
        }

        for rule in &self.exclude {
            let excluded = match rule {
                ExcludeRule::Kind(kind) => &r.kind == kind,
                ExcludeRule::KindName(key) => r.key() == *key,
                ExcludeRule::Label(k, v) => r.labels.get(k) == Some(v),
            };
            if excluded {
                return false;
            }
        }

        true
    }
}
