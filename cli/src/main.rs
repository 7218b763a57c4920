use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;

use tailor::adapters::OcAdapter;
use tailor::config::{Flags, Options, Tailorfile};
use tailor::interrupt::Interrupt;
use tailor::render::{Renderer, TerminalRenderer};
use tailor::{commands, logging, ExitCode};
use tailor_engine::render::Format as RenderFormat;

/// OutputFormat is the CLI-facing spelling of [`RenderFormat`].
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    /// Unified diff of canonical YAML (the default).
    Text,
    /// The raw RFC 6902 patch array, pretty-printed.
    Json,
}

impl From<OutputFormat> for RenderFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Text => RenderFormat::Text,
            OutputFormat::Json => RenderFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "tailor", version, about = "Declarative reconciliation for OpenShift-style resource templates")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Namespace to operate against.
    #[arg(long, short = 'n', env = "TAILOR_NAMESPACE", global = true)]
    namespace: Option<String>,
    /// Label selector (`k=v[,k=v]*`) restricting which resources participate.
    #[arg(long, short = 'l', global = true)]
    selector: Option<String>,
    /// Exclude a kind, `Kind/Name`, or `k=v` label from the reconcile.
    #[arg(long, short = 'e', global = true)]
    exclude: Vec<String>,
    /// Directory templates are read from.
    #[arg(long, short = 't', global = true)]
    template_dir: Option<PathBuf>,
    /// Directory parameter files are read from.
    #[arg(long, global = true)]
    param_dir: Option<PathBuf>,
    /// A single parameter file applied to every template, overriding the
    /// `<TemplateBasename>.env` convention.
    #[arg(long, global = true)]
    param_file: Option<PathBuf>,
    /// Permit deleting everything when the desired list is empty.
    #[arg(long, global = true)]
    force: bool,
    /// Skip the confirmation prompt before `apply`.
    #[arg(long, global = true)]
    non_interactive: bool,
    /// Suppress the delete bucket: never remove stale resources.
    #[arg(long, short = 'u', global = true)]
    upsert_only: bool,
    /// Turn an immutable-field conflict into a delete-then-create.
    #[arg(long, global = true)]
    allow_recreate: bool,
    /// Show `Secret` values in plain text in diffs.
    #[arg(long, global = true)]
    reveal_secrets: bool,
    /// Keep internally-managed annotations in exported and diffed payloads.
    #[arg(long, global = true)]
    with_annotations: bool,
    /// Diff-rendering mode.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,
    /// Preserve-path rule (`Kind:Name:/ptr`, `Kind:*:/ptr`, or `*:*:/ptr`).
    #[arg(long, global = true)]
    ignore_path: Vec<String>,
    /// Do not fail when a template declares a parameter the param file lacks.
    #[arg(long, global = true)]
    ignore_unknown_parameters: bool,
    /// Platform CLI binary to invoke.
    #[arg(long, env = "TAILOR_OC_BIN", global = true)]
    oc_bin: Option<String>,
    /// Override a template parameter (`KEY=VALUE`); may be repeated.
    #[arg(long = "param", global = true)]
    params: Vec<String>,
    /// Path to a `Tailorfile`, if not `./Tailorfile`.
    #[arg(long, default_value = "Tailorfile", global = true)]
    tailorfile: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Show drift between desired and current state.
    #[command(alias = "status")]
    Diff {
        /// Restrict to kinds (`svc,dc`) or a single `Kind/Name`.
        resources: Vec<String>,
    },
    /// Apply the changeset needed to converge current state onto desired state.
    #[command(alias = "update")]
    Apply {
        /// Restrict to kinds (`svc,dc`) or a single `Kind/Name`.
        resources: Vec<String>,
    },
    /// Print the platform's current state.
    Export {
        /// Kinds to export; defaults to the full known kind set.
        kinds: Vec<String>,
    },
    /// Manage encrypted template parameters.
    Secrets {
        #[command(subcommand)]
        action: SecretsCommand,
    },
    /// Print the binary's version.
    Version,
}

#[derive(Subcommand)]
enum SecretsCommand {
    /// Decrypt a parameter file into `$EDITOR`, re-sealing changed values.
    Edit {
        file: PathBuf,
        #[arg(long)]
        secret_key: Option<PathBuf>,
        #[arg(long)]
        passphrase: Option<String>,
        #[arg(long = "public-key")]
        public_keys: Vec<PathBuf>,
    },
    /// Re-seal every encrypted entry against the current public-key set.
    ReEncrypt {
        file: PathBuf,
        #[arg(long)]
        secret_key: Option<PathBuf>,
        #[arg(long)]
        passphrase: Option<String>,
        #[arg(long = "public-key")]
        public_keys: Vec<PathBuf>,
    },
    /// Print every parameter value, plaintext, to stdout.
    Reveal {
        file: PathBuf,
        #[arg(long)]
        secret_key: Option<PathBuf>,
        #[arg(long)]
        passphrase: Option<String>,
    },
    /// Generate a fresh OpenPGP keypair.
    GenerateKey {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        passphrase: String,
    },
}

fn main() -> ProcessExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init() {
        eprintln!("{e}");
        return ProcessExitCode::from(u8::from(ExitCode::Error));
    }

    match run(cli) {
        Ok(code) => ProcessExitCode::from(u8::from(code)),
        Err(e) => {
            eprintln!("error: {e}");
            ProcessExitCode::from(u8::from(ExitCode::Error))
        }
    }
}

fn run(cli: Cli) -> tailor::Result<ExitCode> {
    let renderer = TerminalRenderer::new(std::io::stdout().is_terminal());
    let file = Tailorfile::load_if_exists(&cli.common.tailorfile)?;
    let flags = Flags {
        namespace: cli.common.namespace,
        selector: cli.common.selector,
        exclude: (!cli.common.exclude.is_empty()).then_some(cli.common.exclude),
        template_dir: cli.common.template_dir,
        param_dir: cli.common.param_dir,
        param_file: cli.common.param_file,
        force: cli.common.force,
        non_interactive: cli.common.non_interactive,
        upsert_only: cli.common.upsert_only,
        allow_recreate: cli.common.allow_recreate,
        reveal_secrets: cli.common.reveal_secrets,
        ignore_path: (!cli.common.ignore_path.is_empty()).then_some(cli.common.ignore_path),
        ignore_unknown_parameters: cli.common.ignore_unknown_parameters,
        oc_bin: cli.common.oc_bin,
        with_annotations: cli.common.with_annotations,
        output: cli.common.output.into(),
    };
    let opts = Options::resolve(flags, file)?;
    let params = commands::parse_params(&cli.common.params)?;
    let interrupted = Interrupt::install();
    let platform = OcAdapter::new(opts.oc_bin.clone(), opts.namespace.clone(), interrupted.clone());

    match cli.command {
        Command::Diff { resources } => commands::diff::run(&platform, &renderer, &opts, &params, &resources),
        Command::Apply { resources } => {
            commands::apply::run(&platform, &renderer, &opts, &params, &resources, &interrupted)
        }
        Command::Export { kinds } => commands::export::run(&platform, &renderer, &opts, &kinds),
        Command::Version => Ok(commands::version::run(&renderer)),
        Command::Secrets { action } => run_secrets(action, &renderer),
    }
}

fn run_secrets(action: SecretsCommand, renderer: &dyn Renderer) -> tailor::Result<ExitCode> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    match action {
        SecretsCommand::Edit { file, secret_key, passphrase, public_keys } => {
            let keys = load_key_material(secret_key, passphrase, public_keys)?;
            commands::secrets::edit(&file, &keys, &editor, renderer)
        }
        SecretsCommand::ReEncrypt { file, secret_key, passphrase, public_keys } => {
            let keys = load_key_material(secret_key, passphrase, public_keys)?;
            commands::secrets::re_encrypt(&file, &keys, renderer)
        }
        SecretsCommand::Reveal { file, secret_key, passphrase } => {
            let keys = load_key_material(secret_key, passphrase, Vec::new())?;
            commands::secrets::reveal(&file, &keys, renderer)
        }
        SecretsCommand::GenerateKey { user_id, passphrase } => {
            commands::secrets::generate_key(&user_id, &passphrase, renderer)
        }
    }
}

fn load_key_material(
    secret_key: Option<PathBuf>,
    passphrase: Option<String>,
    public_keys: Vec<PathBuf>,
) -> tailor::Result<commands::secrets::KeyMaterial> {
    let secret_key_armor = secret_key.map(std::fs::read_to_string).transpose()?;
    let public_key_armors = public_keys
        .into_iter()
        .map(std::fs::read_to_string)
        .collect::<std::io::Result<Vec<_>>>()?;
    Ok(commands::secrets::KeyMaterial {
        secret_key_armor,
        passphrase: passphrase.unwrap_or_default(),
        public_key_armors,
    })
}
