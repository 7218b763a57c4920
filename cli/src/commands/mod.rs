//! Commands hold the five subcommands of the CLI surface: `diff`/`status`,
//! `apply`/`update`, `export`, `secrets`, and `version`. Each takes a
//! resolved [`crate::config::Options`], a [`crate::adapters::Platform`],
//! and a [`crate::render::Renderer`], so every one of them runs unmodified
//! against the scripted fake adapter in tests.
pub mod apply;
pub mod diff;
pub mod export;
pub mod secrets;
pub mod version;

use std::path::{Path, PathBuf};

use tailor_model::{Filter, Resource, ResourceList, Source};
use tracing::instrument;

use crate::adapters::Platform;
use crate::config::Options;

/// Discover_templates lists every `*.yml`/`*.yaml` file directly under
/// `dir`, sorted for a deterministic processing order.
pub fn discover_templates(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| crate::Error::Config(format!("template directory {}: {e}", dir.display())))?;
    let mut out = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_template = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        if is_template {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Param_file_for returns the parameter file for `template`: the
/// `--param-file` override if one was given, otherwise
/// `<TemplateBasename>.env` under `opts.param_dir`, if that file exists.
pub fn param_file_for(opts: &Options, template: &Path) -> Option<PathBuf> {
    if let Some(override_path) = &opts.param_file {
        return Some(override_path.clone());
    }
    let stem = template.file_stem()?.to_str()?;
    let candidate = opts.param_dir.join(format!("{stem}.env"));
    candidate.exists().then_some(candidate)
}

/// Build_desired processes every discovered template through the platform
/// and collects the results into one [`ResourceList`].
#[instrument(skip(platform, opts))]
pub fn build_desired(platform: &dyn Platform, opts: &Options, params: &[(String, String)]) -> crate::Result<ResourceList> {
    let mut resources = Vec::new();
    for template in discover_templates(&opts.template_dir)? {
        let param_file = param_file_for(opts, &template);
        let rendered = platform.process(
            &template,
            param_file.as_deref(),
            opts.selector.as_deref(),
            params,
            opts.ignore_unknown_parameters,
        )?;
        for value in rendered {
            resources.push(Resource::from_value(value, Source::Desired)?);
        }
    }
    Ok(ResourceList::from_resources(resources)?)
}

/// Build_current exports the current state of `kinds` from the platform.
#[instrument(skip(platform, opts))]
pub fn build_current(platform: &dyn Platform, opts: &Options, kinds: &[String]) -> crate::Result<ResourceList> {
    let exported = platform.export(kinds, opts.selector.as_deref())?;
    let resources = exported
        .into_iter()
        .map(|v| Resource::from_value(v, Source::Current))
        .collect::<tailor_model::Result<Vec<_>>>()?;
    Ok(ResourceList::from_resources(resources)?)
}

/// Build_filter turns the positional resource tokens plus
/// `opts.selector`/`opts.exclude` into a [`Filter`]. A single
/// `Kind/Name` token selects exactly that resource; any other tokens are
/// kind restrictions (aliases welcome, unknown kinds rejected).
pub fn build_filter(opts: &Options, resources: &[String]) -> crate::Result<Filter> {
    let mut filter = Filter::new();
    match resources {
        [single] if single.contains('/') => {
            filter = filter.with_name(single)?;
        }
        [] => {}
        kinds => {
            let tokens = kinds.iter().flat_map(|k| k.split(',')).filter(|k| !k.is_empty());
            filter = filter.with_kinds(&tailor_model::known_kinds(), tokens)?;
        }
    }
    if let Some(selector) = &opts.selector {
        filter = filter.with_label(selector)?;
    }
    for entry in &opts.exclude {
        filter = apply_exclude(filter, entry)?;
    }
    Ok(filter)
}

fn apply_exclude(filter: Filter, entry: &str) -> crate::Result<Filter> {
    if let Some((k, v)) = entry.split_once('=') {
        Ok(filter.exclude_label(k, v))
    } else if entry.contains('/') || entry.contains(':') {
        Ok(filter.exclude_name(entry)?)
    } else {
        Ok(filter.exclude_kind(entry))
    }
}

/// Filtered returns the subset of `list` the filter accepts.
pub fn filtered(list: &ResourceList, filter: &Filter) -> ResourceList {
    ResourceList::from_resources(list.iter().filter(|r| filter.accept(r)).cloned())
        .expect("filtering an already-deduplicated list cannot introduce duplicates")
}

/// Engine_options translates [`Options`] into [`tailor_engine::Options`].
pub fn engine_options(opts: &Options) -> crate::Result<tailor_engine::Options> {
    let preserve = opts
        .ignore_path
        .iter()
        .map(|s| s.parse())
        .collect::<tailor_engine::Result<Vec<_>>>()?;
    Ok(tailor_engine::Options {
        canon: tailor_engine::canon::Options {
            with_annotations: opts.with_annotations,
            reveal_secrets: opts.reveal_secrets,
        },
        preserve,
        upsert_only: opts.upsert_only,
        allow_recreate: opts.allow_recreate,
        force: opts.force,
        format: opts.output,
    })
}

/// Parse_params turns `KEY=VALUE` strings (from `--param`) into pairs,
/// rejecting entries without an `=`.
pub fn parse_params(raw: &[String]) -> crate::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| crate::Error::Config(format!("malformed --param {entry:?}, expected KEY=VALUE")))
        })
        .collect()
}
