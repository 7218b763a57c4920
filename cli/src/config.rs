//! Config implements `Tailorfile` loading and the `Options` aggregation:
//! every flag is resolved once, at startup, into a single immutable value
//! instead of threading nullable flag pointers through each component.
//! Precedence is CLI flag (clap already merges in environment variables at
//! this stage, so "flag" below means "flag-or-env") over `Tailorfile` over
//! built-in default.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Tailorfile is the on-disk default-settings file: a project checks one
/// in so contributors don't have to repeat common flags.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tailorfile {
    /// Namespace default.
    pub namespace: Option<String>,
    /// Selector default (`k=v[,k=v]*`).
    pub selector: Option<String>,
    /// Exclude entries (`Kind`, `Kind/Name`, or `k=v`).
    pub exclude: Option<Vec<String>>,
    /// Template_dir default.
    pub template_dir: Option<PathBuf>,
    /// Param_dir default.
    pub param_dir: Option<PathBuf>,
    /// Param_file default: a single parameter file applied to every
    /// template, overriding the `<TemplateBasename>.env` convention.
    pub param_file: Option<PathBuf>,
    /// Upsert_only default.
    pub upsert_only: Option<bool>,
    /// Allow_recreate default.
    pub allow_recreate: Option<bool>,
    /// Non_interactive default.
    pub non_interactive: Option<bool>,
    /// Ignore_path entries (preserve-path rules).
    pub ignore_path: Option<Vec<String>>,
    /// Ignore_unknown_parameters default.
    pub ignore_unknown_parameters: Option<bool>,
    /// Oc_bin overrides the platform CLI binary name (`oc` by default).
    pub oc_bin: Option<String>,
}

impl Tailorfile {
    /// Load_if_exists reads and parses `path`, or returns the all-defaults
    /// form if no file is there.
    pub fn load_if_exists(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// Options is the single validated, immutable aggregate downstream
/// components take a borrow of, instead of several optional flags each.
#[derive(Clone, Debug)]
pub struct Options {
    /// Namespace to operate against.
    pub namespace: String,
    /// Selector restricts resources to those carrying these labels.
    pub selector: Option<String>,
    /// Exclude entries ANDed into the filter.
    pub exclude: Vec<String>,
    /// Template_dir is where `*.yml`/`*.yaml` templates are read from.
    pub template_dir: PathBuf,
    /// Param_dir is where `<TemplateBasename>.env` parameter files live.
    pub param_dir: PathBuf,
    /// Param_file, if given, overrides per-template discovery: every
    /// template is processed against this one file instead.
    pub param_file: Option<PathBuf>,
    /// Force permits deleting everything when the desired list is empty.
    pub force: bool,
    /// Non_interactive skips the confirmation prompt before `apply`.
    pub non_interactive: bool,
    /// Upsert_only suppresses the delete bucket.
    pub upsert_only: bool,
    /// Allow_recreate turns an immutable-field conflict into a recreate.
    pub allow_recreate: bool,
    /// Reveal_secrets shows `Secret` values in plain text in diffs.
    pub reveal_secrets: bool,
    /// Ignore_path lists preserve-path rules (`Kind:Name:/ptr`, etc).
    pub ignore_path: Vec<String>,
    /// Ignore_unknown_parameters disables the unknown-parameter check
    /// when processing templates.
    pub ignore_unknown_parameters: bool,
    /// Oc_bin is the platform CLI binary to invoke.
    pub oc_bin: String,
    /// With_annotations keeps internally-managed annotations in exported
    /// and diffed payloads instead of dropping them.
    pub with_annotations: bool,
    /// Output selects which of the two diff-rendering modes to produce.
    pub output: tailor_engine::render::Format,
}

fn pick<T>(flag: Option<T>, file: Option<T>, default: T) -> T {
    flag.or(file).unwrap_or(default)
}

impl Options {
    /// Resolve merges CLI-flag-or-env values over `Tailorfile` values over
    /// built-in defaults into one `Options`.
    pub fn resolve(flags: Flags, file: Tailorfile) -> Result<Self> {
        let namespace = pick(flags.namespace, file.namespace, String::new());
        if namespace.is_empty() {
            return Err(crate::Error::Config(
                "no namespace given; pass --namespace, set TAILOR_NAMESPACE, or set it in Tailorfile".into(),
            ));
        }
        Ok(Self {
            namespace,
            selector: flags.selector.or(file.selector),
            exclude: pick(flags.exclude, file.exclude, Vec::new()),
            template_dir: pick(flags.template_dir, file.template_dir, PathBuf::from("./templates")),
            param_dir: pick(flags.param_dir, file.param_dir, PathBuf::from("./params")),
            param_file: flags.param_file,
            force: flags.force,
            non_interactive: flags.non_interactive || file.non_interactive.unwrap_or(false),
            upsert_only: flags.upsert_only || file.upsert_only.unwrap_or(false),
            allow_recreate: flags.allow_recreate || file.allow_recreate.unwrap_or(false),
            reveal_secrets: flags.reveal_secrets,
            ignore_path: pick(flags.ignore_path, file.ignore_path, Vec::new()),
            ignore_unknown_parameters: flags.ignore_unknown_parameters
                || file.ignore_unknown_parameters.unwrap_or(false),
            oc_bin: pick(flags.oc_bin, file.oc_bin, "oc".to_string()),
            with_annotations: flags.with_annotations,
            output: flags.output,
        })
    }
}

/// Flags is the subset of CLI input that participates in [`Options`]
/// resolution; clap has already merged in any configured environment
/// variables by the time this is built, so a `Some` here always outranks
/// the `Tailorfile`.
#[derive(Clone, Debug, Default)]
pub struct Flags {
    /// Namespace flag/env value, if given.
    pub namespace: Option<String>,
    /// Selector flag value, if given.
    pub selector: Option<String>,
    /// Exclude flag values, if given.
    pub exclude: Option<Vec<String>>,
    /// Template_dir flag value, if given.
    pub template_dir: Option<PathBuf>,
    /// Param_dir flag value, if given.
    pub param_dir: Option<PathBuf>,
    /// Param_file flag value, if given.
    pub param_file: Option<PathBuf>,
    /// Force flag.
    pub force: bool,
    /// Non_interactive flag.
    pub non_interactive: bool,
    /// Upsert_only flag.
    pub upsert_only: bool,
    /// Allow_recreate flag.
    pub allow_recreate: bool,
    /// Reveal_secrets flag.
    pub reveal_secrets: bool,
    /// Ignore_path flag values, if given.
    pub ignore_path: Option<Vec<String>>,
    /// Ignore_unknown_parameters flag.
    pub ignore_unknown_parameters: bool,
    /// Oc_bin flag/env value, if given.
    pub oc_bin: Option<String>,
    /// With_annotations flag.
    pub with_annotations: bool,
    /// Output flag (defaults to text if not overridden by the caller).
    pub output: tailor_engine::render::Format,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_file_wins_over_default() {
        let file = Tailorfile {
            namespace: Some("from-file".into()),
            template_dir: Some(PathBuf::from("/file/templates")),
            ..Tailorfile::default()
        };
        let flags = Flags {
            namespace: Some("from-flag".into()),
            ..Flags::default()
        };
        let opts = Options::resolve(flags, file).unwrap();
        assert_eq!(opts.namespace, "from-flag");
        assert_eq!(opts.template_dir, PathBuf::from("/file/templates"));
        assert_eq!(opts.param_dir, PathBuf::from("./params"));
    }

    #[test]
    fn missing_namespace_is_a_config_error() {
        let err = Options::resolve(Flags::default(), Tailorfile::default()).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
