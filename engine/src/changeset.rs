//! Changeset classifies every resource present in either the desired or
//! current inventory: does it need creating, deleting, patching, or
//! recreating, or is it already in sync.
use std::collections::BTreeSet;

use tailor_model::{Action, Change, Changeset, Resource, ResourceKey, ResourceList};
use tracing::{debug, instrument};

use crate::{canon, diff, immutable, preserve::PreservePath, render, Error, Result};

/// Options configures one run of [`build`].
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Canon controls payload normalization before diffing.
    pub canon: canon::Options,
    /// Preserve lists the fields that must never appear in a generated
    /// patch, regardless of drift.
    pub preserve: Vec<PreservePath>,
    /// Upsert_only suppresses the delete bucket: resources present only in
    /// the current inventory are left alone instead of queued for removal.
    pub upsert_only: bool,
    /// Allow_recreate turns an immutable-field conflict into a `Recreate`
    /// action instead of an error.
    pub allow_recreate: bool,
    /// Force permits building a changeset against an empty desired
    /// inventory, which would otherwise delete everything in `current`.
    pub force: bool,
    /// Format selects which of the two diff-rendering modes populates
    /// each change's `rendered_diff`.
    pub format: render::Format,
}

/// Build classifies every resource in `desired` and `current` into a
/// [`Changeset`], applying preserve-paths and the immutable-field table.
#[instrument(skip_all, fields(desired = desired.len(), current = current.len()))]
pub fn build(desired: &ResourceList, current: &ResourceList, opts: &Options) -> Result<Changeset> {
    if desired.is_empty() && !current.is_empty() && !opts.force && !opts.upsert_only {
        return Err(Error::EmptyDesiredRefusesDelete);
    }

    let mut keys: BTreeSet<ResourceKey> = BTreeSet::new();
    keys.extend(desired.keys().cloned());
    keys.extend(current.keys().cloned());

    let mut out = Changeset::default();
    for key in keys {
        match (current.get(&key), desired.get(&key)) {
            (None, Some(d)) => {
                let desired_view = canon::redact(&key.kind, &canon::normalize(&d.payload, &opts.canon), &opts.canon);
                out.create.push(Change {
                    action: Action::Create,
                    current: None,
                    desired: Some(d.clone()),
                    patches: vec![],
                    rendered_diff: render::render(opts.format, None, Some(&desired_view), &[])?,
                });
            }
            (Some(c), None) => {
                if !opts.upsert_only {
                    let current_view = canon::redact(&key.kind, &canon::normalize(&c.payload, &opts.canon), &opts.canon);
                    out.delete.push(Change {
                        action: Action::Delete,
                        current: Some(c.clone()),
                        desired: None,
                        patches: vec![],
                        rendered_diff: render::render(opts.format, Some(&current_view), None, &[])?,
                    });
                }
            }
            (Some(c), Some(d)) => {
                let change = classify_common(&key, c, d, opts)?;
                match change.action {
                    Action::Noop => out.noop.push(change),
                    Action::Update => out.update.push(change),
                    Action::Recreate => out.recreate.push(change),
                    Action::Create | Action::Delete => {
                        unreachable!("classify_common only returns noop/update/recreate")
                    }
                }
            }
            (None, None) => unreachable!("a key always comes from one of the two lists"),
        }
    }

    debug!(
        create = out.create.len(),
        update = out.update.len(),
        delete = out.delete.len(),
        recreate = out.recreate.len(),
        noop = out.noop.len(),
        "classified changeset"
    );
    Ok(out)
}

/// Classify_common decides what, if anything, needs to happen to bring one
/// resource present on both sides in line with its desired state.
fn classify_common(key: &ResourceKey, current_res: &Resource, desired_res: &Resource, opts: &Options) -> Result<Change> {
    let current_canon = canon::normalize(&current_res.payload, &opts.canon);
    let desired_canon = canon::normalize(&desired_res.payload, &opts.canon);

    let mut patches = diff::diff(&current_canon, &desired_canon);
    patches.retain(|op| !opts.preserve.iter().any(|p| p.matches(key, op.path())));

    if patches.is_empty() {
        return Ok(Change {
            action: Action::Noop,
            current: Some(current_res.clone()),
            desired: Some(desired_res.clone()),
            patches: vec![],
            rendered_diff: String::new(),
        });
    }

    let immutable_hit = patches
        .iter()
        .find(|op| immutable::is_immutable(&key.kind, op.path()));

    let action = if let Some(hit) = immutable_hit {
        if !opts.allow_recreate {
            return Err(Error::ImmutableFieldChanged {
                key: key.clone(),
                path: hit.path().to_string(),
            });
        }
        Action::Recreate
    } else {
        Action::Update
    };

    // The patches above carry the real bytes for the apply driver; the
    // rendered form goes through the redacted view so secret material
    // never reaches a terminal or log.
    let current_view = canon::redact(&key.kind, &current_canon, &opts.canon);
    let desired_view = canon::redact(&key.kind, &desired_canon, &opts.canon);
    let mut display = diff::diff(&current_view, &desired_view);
    display.retain(|op| !opts.preserve.iter().any(|p| p.matches(key, op.path())));
    let rendered_diff = render::render(opts.format, Some(&current_view), Some(&desired_view), &display)?;
    Ok(Change {
        action,
        current: Some(current_res.clone()),
        desired: Some(desired_res.clone()),
        patches,
        rendered_diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tailor_model::Source;

    fn res(_kind: &str, _name: &str, payload: serde_json::Value, source: Source) -> Resource {
        Resource::from_value(payload, source).unwrap()
    }

    #[test]
    fn new_resource_is_created() {
        let desired = ResourceList::from_resources([res(
            "Service",
            "pi",
            json!({"kind": "Service", "metadata": {"name": "pi"}}),
            Source::Desired,
        )])
        .unwrap();
        let current = ResourceList::new();
        let cs = build(&desired, &current, &Options::default()).unwrap();
        assert_eq!(cs.create.len(), 1);
        assert!(cs.update.is_empty());
    }

    #[test]
    fn stale_resource_is_deleted_unless_upsert_only() {
        let current = ResourceList::from_resources([res(
            "Service",
            "pi",
            json!({"kind": "Service", "metadata": {"name": "pi"}}),
            Source::Current,
        )])
        .unwrap();
        let desired = ResourceList::new();

        let opts = Options {
            force: true,
            ..Options::default()
        };
        let cs = build(&desired, &current, &opts).unwrap();
        assert_eq!(cs.delete.len(), 1);

        let upsert_opts = Options {
            force: true,
            upsert_only: true,
            ..Options::default()
        };
        let cs = build(&desired, &current, &upsert_opts).unwrap();
        assert!(cs.delete.is_empty());
    }

    #[test]
    fn empty_desired_refuses_delete_without_force() {
        let current = ResourceList::from_resources([res(
            "Service",
            "pi",
            json!({"kind": "Service", "metadata": {"name": "pi"}}),
            Source::Current,
        )])
        .unwrap();
        let err = build(&ResourceList::new(), &current, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyDesiredRefusesDelete));
    }

    #[test]
    fn matching_resources_are_noop() {
        let payload = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"port": 80}});
        let desired = ResourceList::from_resources([res("Service", "pi", payload.clone(), Source::Desired)]).unwrap();
        let current = ResourceList::from_resources([res("Service", "pi", payload, Source::Current)]).unwrap();
        let cs = build(&desired, &current, &Options::default()).unwrap();
        assert_eq!(cs.noop.len(), 1);
        assert!(cs.update.is_empty());
    }

    #[test]
    fn drifted_resource_is_updated() {
        let current_payload = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"port": 80}});
        let desired_payload = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"port": 8080}});
        let desired = ResourceList::from_resources([res("Service", "pi", desired_payload, Source::Desired)]).unwrap();
        let current = ResourceList::from_resources([res("Service", "pi", current_payload, Source::Current)]).unwrap();
        let cs = build(&desired, &current, &Options::default()).unwrap();
        assert_eq!(cs.update.len(), 1);
        assert_eq!(cs.update[0].patches.len(), 1);
    }

    #[test]
    fn immutable_field_change_errors_without_allow_recreate() {
        let current_payload = json!({
            "kind": "Service", "metadata": {"name": "pi"}, "spec": {"clusterIP": "10.0.0.1"}
        });
        let desired_payload = json!({
            "kind": "Service", "metadata": {"name": "pi"}, "spec": {"clusterIP": "10.0.0.2"}
        });
        let desired = ResourceList::from_resources([res("Service", "pi", desired_payload.clone(), Source::Desired)]).unwrap();
        let current = ResourceList::from_resources([res("Service", "pi", current_payload.clone(), Source::Current)]).unwrap();

        let err = build(&desired, &current, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::ImmutableFieldChanged { .. }));

        let opts = Options {
            allow_recreate: true,
            ..Options::default()
        };
        let cs = build(&desired, &current, &opts).unwrap();
        assert_eq!(cs.recreate.len(), 1);
    }

    #[test]
    fn preserve_path_drops_matching_patch() {
        let current_payload = json!({"kind": "DeploymentConfig", "metadata": {"name": "web"}, "spec": {"replicas": 1}});
        let desired_payload = json!({"kind": "DeploymentConfig", "metadata": {"name": "web"}, "spec": {"replicas": 3}});
        let desired = ResourceList::from_resources([res("DeploymentConfig", "web", desired_payload, Source::Desired)]).unwrap();
        let current = ResourceList::from_resources([res("DeploymentConfig", "web", current_payload, Source::Current)]).unwrap();

        let opts = Options {
            preserve: vec!["DeploymentConfig:web:/spec/replicas".parse().unwrap()],
            ..Options::default()
        };
        let cs = build(&desired, &current, &opts).unwrap();
        assert_eq!(cs.noop.len(), 1);
    }

    #[test]
    fn secret_values_are_redacted_in_the_rendered_diff() {
        let encode = |s: &str| {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD.encode(s)
        };
        let current_payload = json!({
            "kind": "Secret", "metadata": {"name": "db"}, "data": {"password": encode("hunter2")}
        });
        let desired_payload = json!({
            "kind": "Secret", "metadata": {"name": "db"}, "data": {"password": encode("swordfish")}
        });
        let desired = ResourceList::from_resources([res("Secret", "db", desired_payload, Source::Desired)]).unwrap();
        let current = ResourceList::from_resources([res("Secret", "db", current_payload, Source::Current)]).unwrap();

        let cs = build(&desired, &current, &Options::default()).unwrap();
        assert_eq!(cs.update.len(), 1);
        let rendered = &cs.update[0].rendered_diff;
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("swordfish"));
        assert!(rendered.contains("*******"));
        assert!(rendered.contains("*********"));

        // The patch itself still carries the real value for the apply
        // driver.
        match &cs.update[0].patches[0] {
            tailor_model::PatchOp::Replace { path, value } => {
                assert_eq!(path, "/data/password");
                assert_eq!(*value, json!(encode("swordfish")));
            }
            other => panic!("expected a replace op, got {other:?}"),
        }
    }

    #[test]
    fn json_output_format_renders_the_patch_array() {
        let current_payload = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"port": 80}});
        let desired_payload = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"port": 8080}});
        let desired = ResourceList::from_resources([res("Service", "pi", desired_payload, Source::Desired)]).unwrap();
        let current = ResourceList::from_resources([res("Service", "pi", current_payload, Source::Current)]).unwrap();

        let opts = Options {
            format: render::Format::Json,
            ..Options::default()
        };
        let cs = build(&desired, &current, &opts).unwrap();
        let rendered: serde_json::Value = serde_json::from_str(&cs.update[0].rendered_diff).unwrap();
        assert_eq!(rendered, json!([{"op": "replace", "path": "/spec/port", "value": 8080}]));
    }
}
