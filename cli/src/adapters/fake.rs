//! FakeAdapter is a scripted platform double: tests drive a reconcile
//! against canned `process`/`export` output and assert on what
//! `create`/`delete`/`patch` calls the command issued, without a real
//! cluster anywhere in the loop.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tailor_model::PatchOp;

use super::Platform;

/// FakeAdapter holds the resources a test wants to pretend are already in
/// the cluster, the canned output of each template's `process` call, and a
/// record of every mutating call made against it.
#[derive(Default)]
pub struct FakeAdapter {
    /// Current cluster state, keyed by `(kind, name)`.
    pub current: Mutex<BTreeMap<(String, String), Value>>,
    /// Canned `process` output per template path.
    pub templates: Mutex<BTreeMap<PathBuf, Vec<Value>>>,
    /// Whether `whoami` should succeed.
    pub authenticated: Mutex<bool>,
    /// Every resource passed to `create`, in call order.
    pub created: Mutex<Vec<Value>>,
    /// Every `(kind, name)` passed to `delete`, in call order.
    pub deleted: Mutex<Vec<(String, String)>>,
    /// Every `(kind, name, patches)` passed to `patch`, in call order.
    pub patched: Mutex<Vec<(String, String, Vec<PatchOp>)>>,
}

impl FakeAdapter {
    /// New builds an adapter with no seeded state, authenticated by
    /// default.
    pub fn new() -> Self {
        Self {
            authenticated: Mutex::new(true),
            ..Self::default()
        }
    }

    /// Seed_current registers a resource as already present in the
    /// cluster.
    pub fn seed_current(&self, kind: &str, name: &str, payload: Value) {
        self.current
            .lock()
            .expect("fake adapter mutex poisoned")
            .insert((kind.to_string(), name.to_string()), payload);
    }

    /// Seed_template registers what `process`-ing `path` should return.
    pub fn seed_template(&self, path: impl Into<PathBuf>, resources: Vec<Value>) {
        self.templates
            .lock()
            .expect("fake adapter mutex poisoned")
            .insert(path.into(), resources);
    }
}

fn key(resource: &Value) -> (String, String) {
    let kind = resource["kind"].as_str().unwrap_or_default().to_string();
    let name = resource["metadata"]["name"].as_str().unwrap_or_default().to_string();
    (kind, name)
}

impl Platform for FakeAdapter {
    fn whoami(&self) -> crate::Result<()> {
        if *self.authenticated.lock().expect("fake adapter mutex poisoned") {
            Ok(())
        } else {
            Err(crate::Error::Adapter("not logged in".into()))
        }
    }

    fn process(
        &self,
        template_file: &Path,
        _param_file: Option<&Path>,
        _labels: Option<&str>,
        _params: &[(String, String)],
        _ignore_unknown_parameters: bool,
    ) -> crate::Result<Vec<Value>> {
        self.templates
            .lock()
            .expect("fake adapter mutex poisoned")
            .get(template_file)
            .cloned()
            .ok_or_else(|| crate::Error::Template(format!("no canned output for {}", template_file.display())))
    }

    fn export(&self, kinds: &[String], _labels: Option<&str>) -> crate::Result<Vec<Value>> {
        let wanted: std::collections::HashSet<&str> = kinds.iter().map(String::as_str).collect();
        Ok(self
            .current
            .lock()
            .expect("fake adapter mutex poisoned")
            .values()
            .filter(|v| wanted.contains(v["kind"].as_str().unwrap_or_default()))
            .cloned()
            .collect())
    }

    fn exists(&self, kind: &str, name: &str) -> crate::Result<bool> {
        Ok(self
            .current
            .lock()
            .expect("fake adapter mutex poisoned")
            .contains_key(&(kind.to_string(), name.to_string())))
    }

    fn create(&self, resource: &Value) -> crate::Result<()> {
        self.current
            .lock()
            .expect("fake adapter mutex poisoned")
            .insert(key(resource), resource.clone());
        self.created.lock().expect("fake adapter mutex poisoned").push(resource.clone());
        Ok(())
    }

    fn delete(&self, kind: &str, name: &str) -> crate::Result<()> {
        self.current
            .lock()
            .expect("fake adapter mutex poisoned")
            .remove(&(kind.to_string(), name.to_string()));
        self.deleted
            .lock()
            .expect("fake adapter mutex poisoned")
            .push((kind.to_string(), name.to_string()));
        Ok(())
    }

    fn patch(&self, kind: &str, name: &str, patches: &[PatchOp]) -> crate::Result<()> {
        let mut current = self.current.lock().expect("fake adapter mutex poisoned");
        let id = (kind.to_string(), name.to_string());
        if let Some(existing) = current.get(&id) {
            let patched = tailor_engine::diff::apply(existing, patches)?;
            current.insert(id.clone(), patched);
        }
        drop(current);
        self.patched
            .lock()
            .expect("fake adapter mutex poisoned")
            .push((kind.to_string(), name.to_string(), patches.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_is_visible_to_a_later_export() {
        let fake = FakeAdapter::new();
        fake.create(&json!({"kind": "ConfigMap", "metadata": {"name": "a"}})).unwrap();
        let exported = fake.export(&["ConfigMap".to_string()], None).unwrap();
        assert_eq!(exported.len(), 1);
        assert!(fake.exists("ConfigMap", "a").unwrap());
    }

    #[test]
    fn delete_removes_from_current_state() {
        let fake = FakeAdapter::new();
        fake.seed_current("ConfigMap", "a", json!({"kind": "ConfigMap", "metadata": {"name": "a"}}));
        fake.delete("ConfigMap", "a").unwrap();
        assert!(!fake.exists("ConfigMap", "a").unwrap());
        assert_eq!(fake.deleted.lock().unwrap().as_slice(), [("ConfigMap".to_string(), "a".to_string())]);
    }

    #[test]
    fn whoami_fails_when_not_authenticated() {
        let fake = FakeAdapter::new();
        *fake.authenticated.lock().unwrap() = false;
        assert!(fake.whoami().is_err());
    }
}
