#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]
//! Tailor_cipher implements the parameter-file cipher store: the
//! `KEY=value` / `KEY.ENC=envelope` file grammar, the hybrid OpenPGP
//! envelope format, and the read/edit/re-encrypt operations that keep
//! unmodified secrets byte-for-byte stable across a round trip.

pub mod envelope;
pub mod paramfile;
pub mod store;

pub use paramfile::{Line, RawFile, RawParam};
pub use store::{edit, read, reencrypt, KeyConfig};

/// Error enumerates the failures this crate can report.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A parameter file line was neither blank, a comment, the fingerprint
    /// line, nor a `KEY=value` assignment.
    #[error("malformed parameter file line: {0}")]
    MalformedParamFile(String),
    /// An envelope could not be decrypted under the configured key and
    /// passphrase.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),
    /// An encrypt operation was attempted with no recipient public keys.
    #[error("no recipient public keys configured")]
    NoRecipients,
    /// The user's `$EDITOR` exited with a non-zero status.
    #[error("editor exited with a failure status")]
    EditorFailed,
    /// An OpenPGP operation (parsing a key, building a message) failed.
    #[error("openpgp error: {0}")]
    Pgp(#[from] pgp::errors::Error),
    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result typedef for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
