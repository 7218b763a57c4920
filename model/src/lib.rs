#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]
//! Tailor_model holds the plain data types shared by the rest of the
//! workspace: the normalized resource representation, the filter that
//! selects which resources participate in a reconcile, the change/changeset
//! records produced by the diffing engine, and the parameter-file grammar.
//!
//! This crate is deliberately inert: it has no knowledge of `oc`, no
//! cryptography, and no diffing logic. Those live in `tailor_engine` and
//! `tailor_cipher`, which depend on this crate for its types.

mod change;
mod filter;
mod param;
mod resource;

pub use change::{Action, Change, Changeset, PatchOp};
pub use filter::{canonical_kind, known_kinds, Filter, KNOWN_KINDS};
pub use param::{ParamFile, Parameter};
pub use resource::{Resource, ResourceKey, ResourceList, Source};

/// Error enumerates the errors this crate's types can produce on their own
/// (construction and parsing failures). Diffing and apply failures are
/// reported by `tailor_engine`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Two resources in the same list share a `Kind/Name` identity.
    #[error("duplicate resource: {0}")]
    DuplicateResource(ResourceKey),
    /// A kind token could not be mapped to a canonical kind.
    #[error("unknown kind: {0}")]
    UnknownKind(String),
    /// A `Kind/Name` reference could not be parsed.
    #[error("malformed kind/name reference: {0}")]
    MalformedKindName(String),
    /// A label selector could not be parsed.
    #[error("malformed label selector: {0}")]
    MalformedLabelSelector(String),
    /// YAML parsing of a resource payload failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON parsing or serialization of a resource payload failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result typedef for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
