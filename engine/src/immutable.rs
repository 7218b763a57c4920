//! Immutable holds the per-kind table of JSON Pointer subtrees that the
//! platform rejects in-place updates to. A patch that touches one of these
//! paths forces a recreate instead of an update.

/// IMMUTABLE_PATHS maps a canonical kind to the pointer patterns that are
/// immutable for it. A `*` segment matches exactly one path segment
/// (typically an array index), and a pattern matches any path nested under
/// it, not only an exact hit.
const IMMUTABLE_PATHS: &[(&str, &[&str])] = &[
    (
        "DeploymentConfig",
        &["/spec/selector", "/spec/triggers/*/imageChangeParams/from"],
    ),
    ("Service", &["/spec/clusterIP"]),
    ("PersistentVolumeClaim", &["/spec"]),
    ("Route", &["/spec/host"]),
    ("BuildConfig", &["/spec/source/type"]),
];

/// Is_immutable reports whether `path` falls under one of `kind`'s
/// immutable subtrees.
pub fn is_immutable(kind: &str, path: &str) -> bool {
    let path_segments: Vec<&str> = segments(path);
    IMMUTABLE_PATHS
        .iter()
        .filter(|(k, _)| *k == kind)
        .flat_map(|(_, patterns)| patterns.iter())
        .any(|pattern| matches_prefix(pattern, &path_segments))
}

fn matches_prefix(pattern: &str, path_segments: &[&str]) -> bool {
    let pattern_segments = segments(pattern);
    if path_segments.len() < pattern_segments.len() {
        return false;
    }
    pattern_segments
        .iter()
        .zip(path_segments.iter())
        .all(|(p, s)| *p == "*" || p == s)
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_nested_paths_match() {
        assert!(is_immutable("Service", "/spec/clusterIP"));
        assert!(!is_immutable("Service", "/spec/ports"));
    }

    #[test]
    fn whole_subtree_pattern_matches_any_child() {
        assert!(is_immutable("PersistentVolumeClaim", "/spec/resources/requests/storage"));
    }

    #[test]
    fn wildcard_segment_matches_array_index() {
        assert!(is_immutable(
            "DeploymentConfig",
            "/spec/triggers/0/imageChangeParams/from"
        ));
        assert!(is_immutable(
            "DeploymentConfig",
            "/spec/triggers/2/imageChangeParams/from"
        ));
        assert!(!is_immutable("DeploymentConfig", "/spec/triggers/0/type"));
    }

    #[test]
    fn unknown_kind_has_no_immutable_paths() {
        assert!(!is_immutable("ConfigMap", "/data/anything"));
    }
}
