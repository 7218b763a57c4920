//! Render turns a resource pair into the diff shown to a user, in one of
//! two modes: a unified-diff of canonical YAML, or the raw RFC 6902 patch
//! array. Coloring the text form for a terminal is the caller's concern.
use serde_json::Value;
use similar::TextDiff;
use tailor_model::PatchOp;

/// Format selects which of the two diff-rendering modes to produce.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    /// Unified diff of canonical YAML, context = 3 (`similar`'s default).
    #[default]
    Text,
    /// The raw patch array, pretty-printed JSON.
    Json,
}

/// Render produces the rendered form of one change for `format`. `current`
/// and `desired` feed the text mode; `patches` feeds the json mode.
pub fn render(format: Format, current: Option<&Value>, desired: Option<&Value>, patches: &[PatchOp]) -> crate::Result<String> {
    match format {
        Format::Text => Ok(unified(current, desired)),
        Format::Json => json(patches),
    }
}

/// Json renders `patches` as a pretty-printed RFC 6902 patch array, the
/// same shape `oc patch --type=json` expects on the wire.
pub fn json(patches: &[PatchOp]) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(patches)?)
}

/// Unified renders a line-oriented unified diff (context 3) between the
/// canonical YAML form of `current` and `desired`. Either side may be
/// absent, for create/delete changes.
pub fn unified(current: Option<&Value>, desired: Option<&Value>) -> String {
    let before = to_yaml(current);
    let after = to_yaml(desired);
    TextDiff::from_lines(&before, &after)
        .unified_diff()
        .context_radius(3)
        .to_string()
}

fn to_yaml(v: Option<&Value>) -> String {
    v.map(|v| serde_yaml::to_string(v).unwrap_or_default())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn marks_added_and_removed_lines() {
        let current = json!({"spec": {"replicas": 1}});
        let desired = json!({"spec": {"replicas": 3}});
        let out = unified(Some(&current), Some(&desired));
        assert!(out.lines().any(|l| l.starts_with('-') && l.contains('1')));
        assert!(out.lines().any(|l| l.starts_with('+') && l.contains('3')));
    }

    #[test]
    fn create_has_no_removed_lines() {
        let desired = json!({"kind": "Service"});
        let out = unified(None, Some(&desired));
        assert!(out.lines().all(|l| !l.starts_with('-')));
        assert!(out.lines().any(|l| l.starts_with('+')));
    }

    #[test]
    fn json_mode_renders_the_raw_patch_array() {
        let patches = vec![PatchOp::Replace {
            path: "/spec/ports/0/port".into(),
            value: json!(8080),
        }];
        let out = render(Format::Json, None, None, &patches).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!([{"op": "replace", "path": "/spec/ports/0/port", "value": 8080}]));
    }

    #[test]
    fn text_mode_ignores_patches_and_diffs_the_payloads() {
        let current = json!({"spec": {"replicas": 1}});
        let desired = json!({"spec": {"replicas": 3}});
        let out = render(Format::Text, Some(&current), Some(&desired), &[]).unwrap();
        assert!(out.lines().any(|l| l.starts_with('+') && l.contains('3')));
    }
}
