//! Apply (alias `update`) drives a changeset to convergence: `Delete`s,
//! deletes for `Recreate`s, `Create`s, recreate re-creates, then
//! `Update`s. Deletions run first so recreated resources find their names
//! free; updates run last so they see freshly created dependencies.
//! Confirms interactively unless `--non-interactive`; collects per-item
//! failures into one [`MultiError`] instead of aborting on the first. An
//! interrupt stops the run before the next item; the adapter terminates
//! any in-flight subprocess on its own.
use std::fmt::{self, Display, Formatter};
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

use tailor_model::{Change, ResourceKey};
use tracing::instrument;

use crate::adapters::Platform;
use crate::config::Options;
use crate::interrupt::Interrupt;
use crate::render::Renderer;
use crate::ExitCode;

/// Recreate poll deadline and interval.
const RECREATE_POLL_DEADLINE: Duration = Duration::from_secs(60);
const RECREATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// MultiError collects the independent failures of one `apply` run.
#[derive(Debug)]
pub struct MultiError(Vec<(ResourceKey, crate::Error)>);

impl Display for MultiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} item(s) failed to apply:", self.0.len())?;
        for (key, err) in &self.0 {
            writeln!(f, "  {key}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

/// Run confirms (unless non-interactive), applies the changeset in order,
/// and reports the outcome.
#[instrument(skip_all)]
pub fn run(
    platform: &dyn Platform,
    renderer: &dyn Renderer,
    opts: &Options,
    params: &[(String, String)],
    resources: &[String],
    interrupted: &Interrupt,
) -> crate::Result<ExitCode> {
    let changeset = super::diff::build_changeset(platform, opts, params, resources)?;
    if changeset.blank() {
        renderer.info("no drift detected, nothing to apply");
        return Ok(ExitCode::Clean);
    }

    super::diff::report(renderer, &changeset);
    if !opts.non_interactive && !confirm(renderer)? {
        renderer.warn("apply cancelled");
        return Ok(ExitCode::Clean);
    }

    let mut failures = Vec::new();

    for change in &changeset.delete {
        apply_delete(platform, renderer, change, interrupted, &mut failures)?;
    }
    for change in &changeset.recreate {
        apply_delete(platform, renderer, change, interrupted, &mut failures)?;
    }
    for change in &changeset.create {
        apply_create(platform, renderer, change, interrupted, &mut failures)?;
    }
    for change in &changeset.recreate {
        apply_recreate_create(platform, renderer, change, interrupted, &mut failures)?;
    }
    for change in &changeset.update {
        apply_update(platform, renderer, change, interrupted, &mut failures)?;
    }

    if failures.is_empty() {
        renderer.info("apply complete");
        Ok(ExitCode::Clean)
    } else {
        Err(anyhow::Error::new(MultiError(failures)).into())
    }
}

fn confirm(renderer: &dyn Renderer) -> crate::Result<bool> {
    renderer.info("apply the changes above? [y/N] ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn check_interrupted(interrupted: &Interrupt) -> crate::Result<()> {
    if interrupted.raised() {
        Err(crate::Error::Interrupted)
    } else {
        Ok(())
    }
}

fn record<T>(key: ResourceKey, result: crate::Result<T>, failures: &mut Vec<(ResourceKey, crate::Error)>) {
    if let Err(e) = result {
        failures.push((key, e));
    }
}

fn apply_delete(
    platform: &dyn Platform,
    renderer: &dyn Renderer,
    change: &Change,
    interrupted: &Interrupt,
    failures: &mut Vec<(ResourceKey, crate::Error)>,
) -> crate::Result<()> {
    check_interrupted(interrupted)?;
    let key = change.key();
    renderer.info(&format!("deleting {key}"));
    let result = platform.delete(&key.kind, &key.name).map_err(Into::into);
    record(key, result, failures);
    Ok(())
}

fn apply_create(
    platform: &dyn Platform,
    renderer: &dyn Renderer,
    change: &Change,
    interrupted: &Interrupt,
    failures: &mut Vec<(ResourceKey, crate::Error)>,
) -> crate::Result<()> {
    check_interrupted(interrupted)?;
    let key = change.key();
    let Some(desired) = &change.desired else {
        return Ok(());
    };
    renderer.info(&format!("creating {key}"));
    let result = platform.create(&desired.payload).map_err(Into::into);
    record(key, result, failures);
    Ok(())
}

/// Apply_recreate_create waits for the prior delete of `change` to be
/// observed before re-creating it, per the `RecreateTimedOut` invariant.
fn apply_recreate_create(
    platform: &dyn Platform,
    renderer: &dyn Renderer,
    change: &Change,
    interrupted: &Interrupt,
    failures: &mut Vec<(ResourceKey, crate::Error)>,
) -> crate::Result<()> {
    check_interrupted(interrupted)?;
    let key = change.key();
    let Some(desired) = &change.desired else {
        return Ok(());
    };

    let deadline = Instant::now() + RECREATE_POLL_DEADLINE;
    loop {
        check_interrupted(interrupted)?;
        match platform.exists(&key.kind, &key.name) {
            Ok(false) => break,
            Ok(true) => {
                if Instant::now() >= deadline {
                    record::<()>(key.clone(), Err(crate::Error::RecreateTimedOut(key.to_string())), failures);
                    return Ok(());
                }
                thread::sleep(RECREATE_POLL_INTERVAL);
            }
            Err(e) => {
                record::<()>(key, Err(e.into()), failures);
                return Ok(());
            }
        }
    }

    renderer.info(&format!("recreating {key}"));
    let result = platform.create(&desired.payload).map_err(Into::into);
    record(key, result, failures);
    Ok(())
}

fn apply_update(
    platform: &dyn Platform,
    renderer: &dyn Renderer,
    change: &Change,
    interrupted: &Interrupt,
    failures: &mut Vec<(ResourceKey, crate::Error)>,
) -> crate::Result<()> {
    check_interrupted(interrupted)?;
    let key = change.key();
    renderer.info(&format!("updating {key}"));
    let result = platform.patch(&key.kind, &key.name, &change.patches).map_err(Into::into);
    record(key, result, failures);
    Ok(())
}
