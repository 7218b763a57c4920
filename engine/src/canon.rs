//! Canon normalizes a resource payload into the comparable form the
//! diffing engine operates on.
use std::collections::BTreeMap;

use base64::Engine;
use serde_json::Value;

/// Options controls which canonicalization behaviors are enabled for one
/// run of [`normalize`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// With_annotations keeps internally-managed annotations (normally
    /// dropped) in the canonical form.
    pub with_annotations: bool,
    /// Reveal_secrets decodes `Secret` `data` entries into plaintext
    /// `stringData` instead of masking them.
    pub reveal_secrets: bool,
}

/// SERVER_POPULATED_FIELDS are the `metadata` fields the platform assigns
/// on create/update; diffing ignores them since callers never set them
/// directly.
const SERVER_POPULATED_FIELDS: &[&str] = &[
    "creationTimestamp",
    "generation",
    "resourceVersion",
    "selfLink",
    "uid",
];

/// ANNOTATION_PREFIXES marks annotation keys the platform or tooling
/// manages on its own; these are dropped from the canonical form unless
/// `with_annotations` is set.
const ANNOTATION_PREFIXES: &[&str] = &[
    "kubectl.kubernetes.io/",
    "openshift.io/",
    "tailor.opendevstack.org/",
];

/// Normalize returns the canonical form of one API object's payload:
/// server-populated metadata fields and the whole `status` subtree are
/// removed and internally-managed annotations are dropped. Values are kept
/// verbatim (including `Secret` data) so patches computed from two
/// canonical forms carry the real bytes; [`redact`] produces the
/// display-safe view. Key ordering is left to `serde_json`'s default
/// object representation, which is already sorted.
pub fn normalize(payload: &Value, opts: &Options) -> Value {
    let mut v = payload.clone();
    if let Value::Object(root) = &mut v {
        root.remove("status");
        if let Some(Value::Object(meta)) = root.get_mut("metadata") {
            for field in SERVER_POPULATED_FIELDS {
                meta.remove(*field);
            }
            if !opts.with_annotations {
                strip_internal_annotations(meta);
            }
        }
    }
    v
}

/// Redact returns the view of a canonical payload that is safe to render:
/// `Secret` `data` entries are either decoded into `stringData`
/// (`reveal_secrets`) or masked length-preservingly. Non-secret payloads
/// pass through untouched.
pub fn redact(kind: &str, canonical: &Value, opts: &Options) -> Value {
    if kind == "Secret" {
        canonicalize_secret(canonical.clone(), opts.reveal_secrets)
    } else {
        canonical.clone()
    }
}

fn strip_internal_annotations(meta: &mut serde_json::Map<String, Value>) {
    let Some(Value::Object(annotations)) = meta.get_mut("annotations") else {
        return;
    };
    annotations.retain(|k, _| !is_internal_annotation(k));
    if annotations.is_empty() {
        meta.remove("annotations");
    }
}

fn is_internal_annotation(key: &str) -> bool {
    ANNOTATION_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Canonicalize_secret replaces a `Secret`'s base64-encoded `data` map
/// with either a decoded `stringData` map (`reveal`) or a length-preserving
/// `*`-masked `data` map, so diffs are legible without ever printing raw
/// secret bytes unless the caller explicitly asked to see them.
fn canonicalize_secret(mut v: Value, reveal: bool) -> Value {
    let Value::Object(root) = &mut v else {
        return v;
    };
    let Some(Value::Object(data)) = root.remove("data") else {
        return v;
    };
    let mut out = BTreeMap::new();
    for (k, raw) in data {
        let Some(encoded) = raw.as_str() else {
            continue;
        };
        if reveal {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .unwrap_or_else(|| encoded.to_string());
            out.insert(k, Value::String(decoded));
        } else {
            let len = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(|bytes| bytes.len())
                .unwrap_or_else(|_| encoded.len());
            out.insert(k, Value::String("*".repeat(len)));
        }
    }
    let field = if reveal { "stringData" } else { "data" };
    root.insert(field.to_string(), Value::Object(out.into_iter().collect()));
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_is_idempotent() {
        let payload = json!({
            "kind": "Service",
            "metadata": {"name": "pi", "resourceVersion": "123"},
            "status": {"loadBalancer": {}},
            "spec": {"ports": [{"port": 80}]},
        });
        let once = normalize(&payload, &Options::default());
        let twice = normalize(&once, &Options::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn drops_server_populated_fields_and_status() {
        let payload = json!({
            "kind": "Service",
            "metadata": {"name": "pi", "resourceVersion": "123", "uid": "abc"},
            "status": {"loadBalancer": {}},
        });
        let got = normalize(&payload, &Options::default());
        assert_eq!(got["metadata"]["resourceVersion"], Value::Null);
        assert_eq!(got["metadata"]["uid"], Value::Null);
        assert_eq!(got.get("status"), None);
        assert_eq!(got["metadata"]["name"], "pi");
    }

    #[test]
    fn drops_internal_annotations_unless_requested() {
        let payload = json!({
            "kind": "Service",
            "metadata": {
                "name": "pi",
                "annotations": {"kubectl.kubernetes.io/last-applied-configuration": "{}", "team": "data"},
            },
        });
        let dropped = normalize(&payload, &Options::default());
        assert_eq!(dropped["metadata"]["annotations"]["team"], "data");
        assert_eq!(
            dropped["metadata"]["annotations"].get("kubectl.kubernetes.io/last-applied-configuration"),
            None
        );

        let kept = normalize(
            &payload,
            &Options {
                with_annotations: true,
                ..Options::default()
            },
        );
        assert!(kept["metadata"]["annotations"]
            .get("kubectl.kubernetes.io/last-applied-configuration")
            .is_some());
    }

    #[test]
    fn secret_data_masked_by_default_and_revealed_on_request() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("hunter2");
        let payload = json!({
            "kind": "Secret",
            "metadata": {"name": "db"},
            "data": {"password": encoded},
        });
        let masked = redact("Secret", &payload, &Options::default());
        assert_eq!(masked["data"]["password"], "*******");

        let revealed = redact(
            "Secret",
            &payload,
            &Options {
                reveal_secrets: true,
                ..Options::default()
            },
        );
        assert_eq!(revealed["stringData"]["password"], "hunter2");
        assert_eq!(revealed.get("data"), None);
    }
}
