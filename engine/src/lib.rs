#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]
//! Tailor_engine implements the change-set engine: resource normalization,
//! the structural diff that produces RFC 6902 patches, the preserve-path
//! and immutable-path tables, the create/update/delete/recreate
//! classification, and diff rendering.

pub mod canon;
pub mod changeset;
pub mod diff;
pub mod immutable;
pub mod preserve;
pub mod render;

pub use changeset::{build, Options};
pub use preserve::PreservePath;

use tailor_model::ResourceKey;

/// Error enumerates the failures the engine can report.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A model-level error (duplicate identity, malformed reference, ...).
    #[error(transparent)]
    Model(#[from] tailor_model::Error),
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Applying a generated patch to a value failed; indicates a bug in the
    /// diff algorithm rather than bad input.
    #[error("json patch error: {0}")]
    JsonPatch(#[from] json_patch::PatchError),
    /// A preserve-path or label-selector string could not be parsed.
    #[error("malformed preserve path: {0}")]
    MalformedPreservePath(String),
    /// An update would touch a field declared immutable for its kind, and
    /// recreation was not allowed.
    #[error("immutable field changed on {key}: {path}")]
    ImmutableFieldChanged {
        /// Key is the resource this change targets.
        key: ResourceKey,
        /// Path is the immutable JSON pointer that differed.
        path: String,
    },
    /// The desired list is empty while the current list is not, and
    /// `--force` was not given, so deletions are refused. Keeps a broken
    /// template directory from wiping a namespace.
    #[error("desired state is empty but current state is not; refusing to delete without --force")]
    EmptyDesiredRefusesDelete,
}

/// Result typedef for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
