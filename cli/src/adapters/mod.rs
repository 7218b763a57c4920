//! Adapters abstract the external platform CLI as a capability interface:
//! `Process`, `Export`, `Create`, `Delete`, `Patch`, and `Whoami`. The
//! real implementation shells out to `oc`; tests substitute a scripted
//! fake instead of a real cluster.
pub mod fake;
pub mod oc;

use std::path::Path;

use serde_json::Value;
use tailor_model::PatchOp;

pub use fake::FakeAdapter;
pub use oc::OcAdapter;

/// Platform is everything a reconcile needs from the external CLI.
pub trait Platform {
    /// Whoami checks that the configured session is authenticated.
    fn whoami(&self) -> crate::Result<()>;

    /// Process expands a template file with its parameters into the list
    /// of concrete resources it renders to.
    fn process(
        &self,
        template_file: &Path,
        param_file: Option<&Path>,
        labels: Option<&str>,
        params: &[(String, String)],
        ignore_unknown_parameters: bool,
    ) -> crate::Result<Vec<Value>>;

    /// Export dumps the current state of the given kinds, restricted by
    /// `labels` if present.
    fn export(&self, kinds: &[String], labels: Option<&str>) -> crate::Result<Vec<Value>>;

    /// Exists reports whether a single `kind`/`name` resource is currently
    /// present, used by the recreate poll loop.
    fn exists(&self, kind: &str, name: &str) -> crate::Result<bool>;

    /// Create submits a new resource.
    fn create(&self, resource: &Value) -> crate::Result<()>;

    /// Delete removes a resource by kind and name.
    fn delete(&self, kind: &str, name: &str) -> crate::Result<()>;

    /// Patch applies an RFC 6902 patch to an existing resource.
    fn patch(&self, kind: &str, name: &str, patches: &[PatchOp]) -> crate::Result<()>;
}
