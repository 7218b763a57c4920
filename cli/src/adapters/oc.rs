//! OcAdapter shells out to an OpenShift-compatible CLI (`oc` by default,
//! overridable via `Options::oc_bin`) for every platform capability.
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;
use tailor_model::PatchOp;
use tracing::debug;

use super::Platform;
use crate::interrupt::Interrupt;

/// Default bound on any single invocation of the platform CLI.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period between SIGTERM and SIGKILL for an interrupted child.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Parse_timeout interprets a `KUBECTL_TIMEOUT` value (whole seconds),
/// falling back to [`DEFAULT_TIMEOUT`] when it is absent or not a valid
/// integer.
fn parse_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

fn timeout_from_env() -> Duration {
    parse_timeout(std::env::var("KUBECTL_TIMEOUT").ok().as_deref())
}

/// OcAdapter invokes `bin` against `namespace` for every capability.
pub struct OcAdapter {
    bin: String,
    namespace: String,
    timeout: Duration,
    interrupt: Interrupt,
}

impl OcAdapter {
    /// New builds an adapter that invokes `bin` scoped to `namespace`, with
    /// its per-invocation timeout taken from `KUBECTL_TIMEOUT` (seconds) if
    /// set, falling back to [`DEFAULT_TIMEOUT`] otherwise. Raising
    /// `interrupt` mid-call terminates the in-flight child.
    pub fn new(bin: impl Into<String>, namespace: impl Into<String>, interrupt: Interrupt) -> Self {
        Self {
            bin: bin.into(),
            namespace: namespace.into(),
            timeout: timeout_from_env(),
            interrupt,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-n", self.namespace.as_str()]);
        cmd.args(args);
        cmd
    }

    fn run(&self, cmd: Command, stdin_data: Option<&[u8]>) -> crate::Result<std::process::Output> {
        run_with_timeout(cmd, stdin_data, self.timeout, &self.interrupt)
    }
}

fn run_with_timeout(
    mut cmd: Command,
    stdin_data: Option<&[u8]>,
    timeout: Duration,
    interrupt: &Interrupt,
) -> crate::Result<std::process::Output> {
    cmd.stdin(if stdin_data.is_some() { Stdio::piped() } else { Stdio::null() });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!(program = ?cmd.get_program(), args = ?cmd.get_args().collect::<Vec<_>>(), "invoking platform CLI");
    let program = cmd.get_program().to_string_lossy().into_owned();

    let mut child: Child = cmd.spawn()?;
    if let Some(data) = stdin_data {
        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(data)?;
    }

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(_status) = child.try_wait()? {
            return Ok(child.wait_with_output()?);
        }
        if interrupt.raised() {
            terminate(&mut child);
            return Err(crate::Error::Interrupted);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(crate::Error::Adapter(format!(
                "{program} did not finish within {timeout:?}"
            )));
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Terminate sends the child SIGTERM, waits up to [`KILL_GRACE`] for it to
/// exit, and falls back to SIGKILL.
fn terminate(child: &mut Child) {
    if let Ok(pid) = i32::try_from(child.id()) {
        unsafe { libc::kill(pid, libc::SIGTERM) };
    }
    let deadline = Instant::now() + KILL_GRACE;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Err(_) => break,
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn stderr_text(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Parse_resource_list accepts either a Kubernetes `List` document
/// (`{apiVersion, kind: List, items: [...]}`) or a bare YAML sequence, the
/// two shapes `oc get -o yaml` and `oc process -o yaml` return.
fn parse_resource_list(bytes: &[u8]) -> crate::Result<Vec<Value>> {
    let doc: Value = serde_yaml::from_slice(bytes)?;
    match doc {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Ok(vec![Value::Object(map)]),
        },
        Value::Array(items) => Ok(items),
        other => Ok(vec![other]),
    }
}

impl Platform for OcAdapter {
    fn whoami(&self) -> crate::Result<()> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("whoami");
        let output = self.run(cmd, None)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::Error::Adapter(format!(
                "not authenticated against the cluster: {}",
                stderr_text(&output)
            )))
        }
    }

    fn process(
        &self,
        template_file: &Path,
        param_file: Option<&Path>,
        labels: Option<&str>,
        params: &[(String, String)],
        ignore_unknown_parameters: bool,
    ) -> crate::Result<Vec<Value>> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-n", self.namespace.as_str(), "process", "-f"]);
        cmd.arg(template_file);
        cmd.args(["-o", "yaml"]);
        if let Some(pf) = param_file {
            cmd.arg("--param-file").arg(pf);
        }
        if ignore_unknown_parameters {
            cmd.arg("--ignore-unknown-parameters");
        }
        if let Some(l) = labels {
            cmd.args(["-l", l]);
        }
        for (k, v) in params {
            cmd.args(["-p", format!("{k}={v}").as_str()]);
        }
        let output = self.run(cmd, None)?;
        if !output.status.success() {
            return Err(crate::Error::Template(format!(
                "{}: {}",
                template_file.display(),
                stderr_text(&output)
            )));
        }
        parse_resource_list(&output.stdout)
    }

    fn export(&self, kinds: &[String], labels: Option<&str>) -> crate::Result<Vec<Value>> {
        let joined = kinds.join(",");
        let mut cmd = self.command(&["get", joined.as_str(), "-o", "yaml"]);
        if let Some(l) = labels {
            cmd.args(["-l", l]);
        }
        let output = self.run(cmd, None)?;
        if !output.status.success() {
            return Err(crate::Error::Export(stderr_text(&output)));
        }
        parse_resource_list(&output.stdout)
    }

    fn exists(&self, kind: &str, name: &str) -> crate::Result<bool> {
        let cmd = self.command(&["get", kind, name, "-o", "name"]);
        let output = self.run(cmd, None)?;
        Ok(output.status.success())
    }

    fn create(&self, resource: &Value) -> crate::Result<()> {
        let payload = serde_yaml::to_string(resource)?;
        let cmd = self.command(&["create", "-f", "-"]);
        let output = self.run(cmd, Some(payload.as_bytes()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::Error::Adapter(stderr_text(&output)))
        }
    }

    fn delete(&self, kind: &str, name: &str) -> crate::Result<()> {
        let cmd = self.command(&["delete", kind, name]);
        let output = self.run(cmd, None)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::Error::Adapter(stderr_text(&output)))
        }
    }

    fn patch(&self, kind: &str, name: &str, patches: &[PatchOp]) -> crate::Result<()> {
        let body = serde_json::to_string(patches)?;
        let cmd = self.command(&["patch", kind, name, "--type=json", "-p", body.as_str()]);
        let output = self.run(cmd, None)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::Error::Adapter(stderr_text(&output)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_kubernetes_list_document() {
        let yaml = b"apiVersion: v1\nkind: List\nitems:\n- kind: ConfigMap\n  metadata:\n    name: a\n";
        let items = parse_resource_list(yaml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["metadata"]["name"], "a");
    }

    #[test]
    fn timeout_falls_back_to_default_when_unset_or_invalid() {
        assert_eq!(parse_timeout(None), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("not-a-number")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("5")), Duration::from_secs(5));
    }

    #[test]
    fn parses_a_bare_sequence() {
        let yaml = b"- kind: ConfigMap\n  metadata:\n    name: a\n- kind: ConfigMap\n  metadata:\n    name: b\n";
        let items = parse_resource_list(yaml).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn a_raised_interrupt_terminates_the_child() {
        let interrupt = Interrupt::new();
        interrupt.raise();
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let started = Instant::now();
        let err = run_with_timeout(cmd, None, Duration::from_secs(30), &interrupt).unwrap_err();
        assert!(matches!(err, crate::Error::Interrupted));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
