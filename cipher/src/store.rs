//! Store implements the parameter-file operations: read, edit (through
//! the user's `$EDITOR`), and re-encrypt. Envelopes whose plaintext did
//! not change are kept byte-for-byte on disk.
use std::io::Write as _;
use std::path::Path;

use pgp::{SignedPublicKey, SignedSecretKey};
use tailor_model::{ParamFile, Parameter};
use tracing::{debug, instrument};

use crate::envelope;
use crate::paramfile::{Line, RawFile, RawParam};
use crate::{Error, Result};

/// KeyConfig is the key material one store operation needs: the private
/// key (and its passphrase) used to decrypt, and the public keys every
/// re-encrypted value is wrapped for.
#[derive(Default)]
pub struct KeyConfig {
    /// Secret_key decrypts existing `.ENC` values. Required by any
    /// operation that reads an encrypted parameter.
    pub secret_key: Option<SignedSecretKey>,
    /// Passphrase unlocks `secret_key`, if it is itself encrypted.
    pub passphrase: String,
    /// Public_keys receives every value this store (re-)encrypts.
    pub public_keys: Vec<SignedPublicKey>,
}

/// Read parses the file at `path` and decrypts every `.ENC` entry,
/// returning a [`ParamFile`] whose parameters are all plaintext.
#[instrument(skip(keys))]
pub fn read(path: &Path, keys: &KeyConfig) -> Result<ParamFile> {
    let text = std::fs::read_to_string(path)?;
    let raw = RawFile::parse(&text)?;
    let mut params = Vec::new();
    for p in raw.params() {
        let value = decrypt_if_needed(p, keys)?;
        params.push(Parameter {
            key: p.key.clone(),
            value,
            encrypted: p.encrypted,
        });
    }
    Ok(ParamFile {
        params,
        fingerprints: raw.fingerprints(),
    })
}

fn decrypt_if_needed(p: &RawParam, keys: &KeyConfig) -> Result<String> {
    if !p.encrypted {
        return Ok(p.raw_value.clone());
    }
    let key = keys
        .secret_key
        .as_ref()
        .ok_or_else(|| Error::KeyMismatch(format!("no private key configured to decrypt {}", p.key)))?;
    envelope::open(&p.raw_value, key, &keys.passphrase)
}

/// Edit decrypts the file into a plaintext buffer, runs `editor_cmd`
/// against it, and writes back a file where: untouched entries keep their
/// original bytes exactly (plain or encrypted), entries removed from the
/// buffer are removed from the file, and any entry whose plaintext changed
/// (or that is brand new) is (re-)encrypted against the configured
/// public-key set before being written.
#[instrument(skip(keys))]
pub fn edit(path: &Path, keys: &KeyConfig, editor_cmd: &str) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let original = RawFile::parse(&text)?;

    let mut plaintext_buffer = original.clone();
    for line in plaintext_buffer.lines.iter_mut() {
        if let Line::Param(p) = line {
            if p.encrypted {
                p.raw_value = decrypt_if_needed(p, keys)?;
            }
        }
    }

    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(plaintext_buffer.render().as_bytes())?;
    tmp.flush()?;
    let tmp_path = tmp.into_temp_path();
    let buffer_path: &Path = &tmp_path;

    let status = std::process::Command::new(editor_cmd).arg(buffer_path).status()?;
    if !status.success() {
        return Err(Error::EditorFailed);
    }

    let edited_text = std::fs::read_to_string(buffer_path)?;
    let edited = RawFile::parse(&edited_text)?;

    let mut result = original.clone();
    let edited_keys: std::collections::BTreeSet<&str> = edited.params().map(|p| p.key.as_str()).collect();
    result
        .lines
        .retain(|l| !matches!(l, Line::Param(p) if !edited_keys.contains(p.key.as_str())));
    for edited_param in edited.params() {
        let before = plaintext_buffer.params().find(|p| p.key == edited_param.key);
        let unchanged = before.is_some_and(|p| p.raw_value == edited_param.raw_value);
        if unchanged {
            continue;
        }

        let originally_encrypted = original
            .params()
            .find(|p| p.key == edited_param.key)
            .map(|p| p.encrypted)
            .unwrap_or(true);

        if originally_encrypted {
            let envelope = envelope::seal(&edited_param.raw_value, &keys.public_keys)?;
            result.set_param(RawParam {
                key: edited_param.key.clone(),
                raw_value: envelope,
                encrypted: true,
            });
        } else {
            result.set_param(RawParam {
                key: edited_param.key.clone(),
                raw_value: edited_param.raw_value.clone(),
                encrypted: false,
            });
        }
    }

    debug!(path = %path.display(), "writing edited parameter file");
    write_atomic(path, &result.render())
}

/// Reencrypt decrypts and re-seals every `.ENC` entry against the current
/// public-key set, without changing any plaintext.
#[instrument(skip(keys))]
pub fn reencrypt(path: &Path, keys: &KeyConfig) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let mut raw = RawFile::parse(&text)?;
    for line in raw.lines.iter_mut() {
        if let Line::Param(p) = line {
            if p.encrypted {
                let plaintext = decrypt_if_needed(p, keys)?;
                p.raw_value = envelope::seal(&plaintext, &keys.public_keys)?;
            }
        }
    }
    write_atomic(path, &raw.render())
}

/// Write_atomic writes `contents` to `path` by creating a temp file in the
/// same directory and renaming it into place, so a crash mid-write never
/// leaves a partial parameter file on disk.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn read_returns_plaintext_values_for_unencrypted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.env");
        fs::write(&path, "NAMESPACE=myapp-staging\n").unwrap();

        let out = read(&path, &KeyConfig::default()).unwrap();
        assert_eq!(out.get("NAMESPACE").unwrap().value, "myapp-staging");
    }

    #[test]
    fn read_fails_closed_when_encrypted_entry_has_no_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.env");
        fs::write(&path, "PASSWORD.ENC=AAAA\n").unwrap();

        let err = read(&path, &KeyConfig::default()).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch(_)));
    }

    #[test]
    fn reencrypt_without_key_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.env");
        fs::write(&path, "PASSWORD.ENC=AAAA\n").unwrap();

        let err = reencrypt(&path, &KeyConfig::default()).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch(_)));
    }
}
