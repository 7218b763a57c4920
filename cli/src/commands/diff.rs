//! Diff (alias `status`) computes drift between the desired and current
//! inventories and reports it without mutating anything.
use tailor_model::Changeset;
use tracing::instrument;

use crate::adapters::Platform;
use crate::config::Options;
use crate::render::Renderer;
use crate::ExitCode;

/// Run computes the changeset and prints one unified diff per non-noop
/// item. Returns [`ExitCode::Drift`] if anything would change,
/// [`ExitCode::Clean`] otherwise.
#[instrument(skip_all)]
pub fn run(
    platform: &dyn Platform,
    renderer: &dyn Renderer,
    opts: &Options,
    params: &[(String, String)],
    resources: &[String],
) -> crate::Result<ExitCode> {
    let changeset = build_changeset(platform, opts, params, resources)?;
    report(renderer, &changeset);
    Ok(if changeset.blank() { ExitCode::Clean } else { ExitCode::Drift })
}

/// Build_changeset runs the full desired/current/classify pipeline shared
/// by `diff` and `apply`.
pub fn build_changeset(
    platform: &dyn Platform,
    opts: &Options,
    params: &[(String, String)],
    resources: &[String],
) -> crate::Result<Changeset> {
    platform.whoami()?;
    let filter = super::build_filter(opts, resources)?;

    let desired = super::build_desired(platform, opts, params)?;
    let desired = super::filtered(&desired, &filter);
    let current = super::build_current(platform, opts, &filter.selected_kinds())?;
    let current = super::filtered(&current, &filter);

    let engine_opts = super::engine_options(opts)?;
    Ok(tailor_engine::build(&desired, &current, &engine_opts)?)
}

/// Report renders every change in `cs` to `renderer`: an in-sync line per
/// noop, a header plus diff per pending mutation, and the bucket counts.
pub fn report(renderer: &dyn Renderer, cs: &Changeset) {
    for change in &cs.noop {
        renderer.info(&format!("* {} is in sync", change.key()));
    }
    for (verb, bucket) in [
        ("created", &cs.create),
        ("updated", &cs.update),
        ("deleted", &cs.delete),
        ("recreated", &cs.recreate),
    ] {
        for change in bucket.iter() {
            renderer.info(&format!("* {} will be {verb}", change.key()));
            renderer.diff(&change.rendered_diff);
        }
    }
    renderer.info(&format!(
        "{} to create, {} to update, {} to delete, {} to recreate",
        cs.create.len(),
        cs.update.len(),
        cs.delete.len(),
        cs.recreate.len()
    ));
}
