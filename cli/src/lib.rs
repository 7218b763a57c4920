#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]
//! Tailor is a declarative reconciliation CLI: local templates describe
//! the desired state of a namespace, the platform CLI reports the current
//! state, and this crate computes and optionally applies the drift
//! between them.

pub mod adapters;
pub mod commands;
pub mod config;
pub mod interrupt;
pub mod logging;
pub mod render;

/// Error is the top-level error type returned from `main`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A model-level error: duplicate identity, unknown kind, malformed
    /// reference.
    #[error(transparent)]
    Model(#[from] tailor_model::Error),
    /// A changeset-engine error: immutable field conflict, empty-desired
    /// safety rail, malformed preserve path.
    #[error(transparent)]
    Engine(#[from] tailor_engine::Error),
    /// A parameter cipher store error.
    #[error(transparent)]
    Cipher(#[from] tailor_cipher::Error),
    /// Config indicates a bad flag combination, missing file, or malformed
    /// `Tailorfile`.
    #[error("configuration error: {0}")]
    Config(String),
    /// Template indicates the external CLI failed to process a template.
    #[error("template processing failed: {0}")]
    Template(String),
    /// Export indicates the external CLI failed to read current state.
    #[error("export failed: {0}")]
    Export(String),
    /// Adapter indicates the external CLI returned non-zero during apply.
    #[error("platform command failed: {0}")]
    Adapter(String),
    /// RecreateTimedOut indicates a delete-then-create did not observe the
    /// resource's disappearance within the deadline.
    #[error("timed out waiting for {0} to be deleted before recreating")]
    RecreateTimedOut(String),
    /// Interrupted indicates the user cancelled an in-flight apply.
    #[error("interrupted")]
    Interrupted,
    /// Io indicates a filesystem error reading templates, parameters, or
    /// the `Tailorfile`.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Yaml indicates a YAML document could not be parsed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Json indicates a JSON document could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Toml indicates a `Tailorfile` could not be parsed.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    /// TracingConfig indicates `TAILOR_LOG` could not be parsed.
    #[error("tracing filter error: {0}")]
    TracingConfig(#[from] tracing_subscriber::filter::ParseError),
    /// Tracing indicates the logging subscriber could not be installed.
    #[error("tracing error: {0}")]
    Tracing(#[from] tracing::subscriber::SetGlobalDefaultError),
    /// Other is a catch-all for errors that do not need their own variant.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result typedef for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// ExitCode maps an outcome to the fixed process exit codes: `0` success
/// with no drift, `3` success with drift detected (`diff` only), `1` any
/// error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitCode {
    /// Success, and (for `diff`) no drift was found.
    Clean,
    /// Any error.
    Error,
    /// Success, but drift was found (`diff` only).
    Drift,
}

impl From<ExitCode> for u8 {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Clean => 0,
            ExitCode::Error => 1,
            ExitCode::Drift => 3,
        }
    }
}
