//! Export prints the platform's current state for the configured
//! selector/kinds, without reference to any template.
use tracing::instrument;

use crate::adapters::Platform;
use crate::config::Options;
use crate::render::Renderer;
use crate::ExitCode;

/// Run exports every resource of `kinds` (or, if empty, every kind in the
/// known set), normalizes the payloads, and prints them as a YAML list.
#[instrument(skip_all)]
pub fn run(platform: &dyn Platform, renderer: &dyn Renderer, opts: &Options, kinds: &[String]) -> crate::Result<ExitCode> {
    platform.whoami()?;
    let filter = super::build_filter(opts, kinds)?;
    let current = super::build_current(platform, opts, &filter.selected_kinds())?;
    let current = super::filtered(&current, &filter);

    let canon_opts = super::engine_options(opts)?.canon;
    let payloads: Vec<serde_json::Value> = current
        .iter()
        .map(|r| tailor_engine::canon::normalize(&r.payload, &canon_opts))
        .collect();
    let doc = serde_json::json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": payloads,
    });
    renderer.info(&serde_yaml::to_string(&doc)?);
    Ok(ExitCode::Clean)
}
