//! End-to-end scenarios exercising each subcommand against a scripted
//! `FakeAdapter`, from a clean no-drift reconcile through recreates and
//! encrypted parameter round-trips.
use pgp::ser::Serialize as _;
use serde_json::json;

use tailor::adapters::FakeAdapter;
use tailor::commands;
use tailor::config::{Flags, Options, Tailorfile};
use tailor::interrupt::Interrupt;
use tailor::render::RecordingRenderer;
use tailor::ExitCode;

fn opts_for(template_dir: &std::path::Path, param_dir: &std::path::Path) -> Options {
    let flags = Flags {
        namespace: Some("demo".into()),
        template_dir: Some(template_dir.to_path_buf()),
        param_dir: Some(param_dir.to_path_buf()),
        non_interactive: true,
        ..Flags::default()
    };
    Options::resolve(flags, Tailorfile::default()).unwrap()
}

#[test]
fn s1_no_drift() {
    let templates = tempfile::tempdir().unwrap();
    let params = tempfile::tempdir().unwrap();
    let template_path = templates.path().join("service.yml");
    std::fs::write(&template_path, "kind: Template\n").unwrap();

    let payload = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"ports": [{"port": 80}]}});

    let fake = FakeAdapter::new();
    fake.seed_template(&template_path, vec![payload.clone()]);
    fake.seed_current("Service", "pi", payload);

    let renderer = RecordingRenderer::new();
    let opts = opts_for(templates.path(), params.path());
    let code = commands::diff::run(&fake, &renderer, &opts, &[], &[]).unwrap();

    assert_eq!(code, ExitCode::Clean);
    assert!(renderer.lines().iter().any(|l| l == "* Service/pi is in sync"));
}

#[test]
fn s2_simple_update_diffs_and_applies_a_patch() {
    let templates = tempfile::tempdir().unwrap();
    let params = tempfile::tempdir().unwrap();
    let template_path = templates.path().join("service.yml");
    std::fs::write(&template_path, "kind: Template\n").unwrap();

    let current = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"ports": [{"port": 80}]}});
    let desired = json!({"kind": "Service", "metadata": {"name": "pi"}, "spec": {"ports": [{"port": 8080}]}});

    let fake = FakeAdapter::new();
    fake.seed_template(&template_path, vec![desired]);
    fake.seed_current("Service", "pi", current);

    let renderer = RecordingRenderer::new();
    let opts = opts_for(templates.path(), params.path());

    let diff_code = commands::diff::run(&fake, &renderer, &opts, &[], &[]).unwrap();
    assert_eq!(diff_code, ExitCode::Drift);

    let apply_code = commands::apply::run(&fake, &renderer, &opts, &[], &[], &Interrupt::new()).unwrap();
    assert_eq!(apply_code, ExitCode::Clean);

    let patched = fake.patched.lock().unwrap();
    assert_eq!(patched.len(), 1);
    let (kind, name, ops) = &patched[0];
    assert_eq!(kind, "Service");
    assert_eq!(name, "pi");
    assert_eq!(ops.len(), 1);
    match &ops[0] {
        tailor_model::PatchOp::Replace { path, value } => {
            assert_eq!(path, "/spec/ports/0/port");
            assert_eq!(*value, json!(8080));
        }
        other => panic!("expected a replace op, got {other:?}"),
    }
}

#[test]
fn s3_immutable_field_requires_allow_recreate() {
    let templates = tempfile::tempdir().unwrap();
    let params = tempfile::tempdir().unwrap();
    let template_path = templates.path().join("pvc.yml");
    std::fs::write(&template_path, "kind: Template\n").unwrap();

    let current = json!({"kind": "PersistentVolumeClaim", "metadata": {"name": "data"}, "spec": {"resources": {"requests": {"storage": "1Gi"}}}});
    let desired = json!({"kind": "PersistentVolumeClaim", "metadata": {"name": "data"}, "spec": {"resources": {"requests": {"storage": "2Gi"}}}});

    let fake = FakeAdapter::new();
    fake.seed_template(&template_path, vec![desired.clone()]);
    fake.seed_current("PersistentVolumeClaim", "data", current.clone());

    let renderer = RecordingRenderer::new();
    let opts = opts_for(templates.path(), params.path());
    let err = commands::diff::run(&fake, &renderer, &opts, &[], &[]).unwrap_err();
    assert!(matches!(err, tailor::Error::Engine(tailor_engine::Error::ImmutableFieldChanged { .. })));

    let fake = FakeAdapter::new();
    fake.seed_template(&template_path, vec![desired]);
    fake.seed_current("PersistentVolumeClaim", "data", current);
    let mut flags = Flags {
        namespace: Some("demo".into()),
        template_dir: Some(templates.path().to_path_buf()),
        param_dir: Some(params.path().to_path_buf()),
        non_interactive: true,
        ..Flags::default()
    };
    flags.allow_recreate = true;
    let opts = Options::resolve(flags, Tailorfile::default()).unwrap();

    let code = commands::apply::run(&fake, &renderer, &opts, &[], &[], &Interrupt::new()).unwrap();
    assert_eq!(code, ExitCode::Clean);
    assert_eq!(
        fake.deleted.lock().unwrap().as_slice(),
        [("PersistentVolumeClaim".to_string(), "data".to_string())]
    );
    assert_eq!(fake.created.lock().unwrap().len(), 1);
}

#[test]
fn s4_preserve_path_keeps_a_drifted_field_out_of_the_diff() {
    let templates = tempfile::tempdir().unwrap();
    let params = tempfile::tempdir().unwrap();
    let template_path = templates.path().join("bc.yml");
    std::fs::write(&template_path, "kind: Template\n").unwrap();

    let current = json!({"kind": "BuildConfig", "metadata": {"name": "bar"}, "spec": {"output": {"to": {"name": "bar:v2"}}}});
    let desired = json!({"kind": "BuildConfig", "metadata": {"name": "bar"}, "spec": {"output": {"to": {"name": "bar:latest"}}}});

    let fake = FakeAdapter::new();
    fake.seed_template(&template_path, vec![desired]);
    fake.seed_current("BuildConfig", "bar", current);

    let renderer = RecordingRenderer::new();
    let mut flags = Flags {
        namespace: Some("demo".into()),
        template_dir: Some(templates.path().to_path_buf()),
        param_dir: Some(params.path().to_path_buf()),
        non_interactive: true,
        ..Flags::default()
    };
    flags.ignore_path = Some(vec!["bc:bar:/spec/output/to/name".to_string()]);
    let opts = Options::resolve(flags, Tailorfile::default()).unwrap();

    let code = commands::diff::run(&fake, &renderer, &opts, &[], &[]).unwrap();
    assert_eq!(code, ExitCode::Clean);
}

#[test]
fn s5_upsert_only_leaves_stale_resources_alone() {
    let templates = tempfile::tempdir().unwrap();
    let params = tempfile::tempdir().unwrap();
    let template_path = templates.path().join("cm.yml");
    std::fs::write(&template_path, "kind: Template\n").unwrap();

    let kept = json!({"kind": "ConfigMap", "metadata": {"name": "kept"}});
    let fake = FakeAdapter::new();
    fake.seed_template(&template_path, vec![kept.clone()]);
    fake.seed_current("ConfigMap", "kept", kept);
    fake.seed_current("ConfigMap", "extra", json!({"kind": "ConfigMap", "metadata": {"name": "extra"}}));

    let mut flags = Flags {
        namespace: Some("demo".into()),
        template_dir: Some(templates.path().to_path_buf()),
        param_dir: Some(params.path().to_path_buf()),
        non_interactive: true,
        ..Flags::default()
    };
    flags.upsert_only = true;
    let opts = Options::resolve(flags, Tailorfile::default()).unwrap();

    let changeset = commands::diff::build_changeset(&fake, &opts, &[], &[]).unwrap();
    assert!(changeset.delete.is_empty());
    assert!(changeset.blank());

    let renderer = RecordingRenderer::new();
    let code = commands::diff::run(&fake, &renderer, &opts, &[], &[]).unwrap();
    assert_eq!(code, ExitCode::Clean);
    assert!(renderer.lines().iter().any(|l| l.contains("0 to delete")));
}

#[test]
fn s6_secret_edit_is_byte_stable_when_nothing_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.env");

    let (secret_key, public_key) = tailor_cipher::envelope::generate_keypair("ops@example.com", "swordfish").unwrap();
    let envelope = tailor_cipher::envelope::seal("hunter2", std::slice::from_ref(&public_key)).unwrap();
    let original = format!("PASSWORD.ENC={envelope}\n");
    std::fs::write(&path, &original).unwrap();

    let keys = commands::secrets::KeyMaterial {
        secret_key_armor: Some(secret_key.to_armored_string(None).unwrap()),
        passphrase: "swordfish".to_string(),
        public_key_armors: vec![public_key.to_armored_string(None).unwrap()],
    };

    let renderer = RecordingRenderer::new();
    // A no-op editor: exits successfully without touching the temp buffer.
    commands::secrets::edit(&path, &keys, "true", &renderer).unwrap();

    let after = std::fs::read_to_string(&path).unwrap();
    assert_eq!(after, original);
}

#[test]
fn secret_edit_reseals_a_changed_value() {
    use std::os::unix::fs::PermissionsExt as _;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.env");

    let (secret_key, public_key) = tailor_cipher::envelope::generate_keypair("ops@example.com", "").unwrap();
    let envelope = tailor_cipher::envelope::seal("hunter2", std::slice::from_ref(&public_key)).unwrap();
    std::fs::write(&path, format!("PASSWORD.ENC={envelope}\n")).unwrap();

    // An "editor" that rewrites the decrypted buffer with a new value.
    let editor = dir.path().join("editor.sh");
    std::fs::write(&editor, "#!/bin/sh\nprintf 'PASSWORD.ENC=swordfish\\n' > \"$1\"\n").unwrap();
    std::fs::set_permissions(&editor, std::fs::Permissions::from_mode(0o755)).unwrap();

    let keys = commands::secrets::KeyMaterial {
        secret_key_armor: Some(secret_key.to_armored_string(None).unwrap()),
        passphrase: String::new(),
        public_key_armors: vec![public_key.to_armored_string(None).unwrap()],
    };

    let renderer = RecordingRenderer::new();
    commands::secrets::edit(&path, &keys, editor.to_str().unwrap(), &renderer).unwrap();

    let after = std::fs::read_to_string(&path).unwrap();
    let resealed = after.trim_end().strip_prefix("PASSWORD.ENC=").unwrap();
    assert!(!after.contains("swordfish"));
    assert_ne!(resealed, envelope);

    let key_config = tailor_cipher::KeyConfig {
        secret_key: Some(secret_key),
        passphrase: String::new(),
        public_keys: vec![],
    };
    let file = tailor_cipher::read(&path, &key_config).unwrap();
    assert_eq!(file.get("PASSWORD").unwrap().value, "swordfish");
}
