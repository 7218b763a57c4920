//! Secrets wires the `secrets {edit, re-encrypt, reveal, generate-key}`
//! subcommands to `tailor_cipher::store`.
use std::path::Path;

use pgp::ser::Serialize as _;
use tailor_cipher::{envelope, store, KeyConfig};
use tracing::instrument;

use crate::render::Renderer;
use crate::ExitCode;

/// Key_material is everything a `secrets` invocation needs to read
/// key-protected parameter files: the operator's own secret key plus every
/// recipient public key new/changed entries are sealed against.
pub struct KeyMaterial {
    /// Secret_key_armor is the operator's own armored private key, if one
    /// was configured.
    pub secret_key_armor: Option<String>,
    /// Passphrase unlocks `secret_key_armor`.
    pub passphrase: String,
    /// Public_key_armors are every recipient's armored public key.
    pub public_key_armors: Vec<String>,
}

impl KeyMaterial {
    fn resolve(&self) -> crate::Result<KeyConfig> {
        let secret_key = self
            .secret_key_armor
            .as_deref()
            .map(envelope::load_secret_key)
            .transpose()?;
        let public_keys = self
            .public_key_armors
            .iter()
            .map(|armor| envelope::load_public_key(armor))
            .collect::<tailor_cipher::Result<Vec<_>>>()?;
        Ok(KeyConfig {
            secret_key,
            passphrase: self.passphrase.clone(),
            public_keys,
        })
    }
}

/// Edit decrypts `path` into the user's `$EDITOR`, then re-seals any
/// entry whose plaintext changed.
#[instrument(skip(keys, renderer))]
pub fn edit(path: &Path, keys: &KeyMaterial, editor: &str, renderer: &dyn Renderer) -> crate::Result<ExitCode> {
    store::edit(path, &keys.resolve()?, editor)?;
    renderer.info(&format!("{} updated", path.display()));
    Ok(ExitCode::Clean)
}

/// Re_encrypt re-seals every `.ENC` entry against the current public-key
/// set without changing any plaintext.
#[instrument(skip(keys, renderer))]
pub fn re_encrypt(path: &Path, keys: &KeyMaterial, renderer: &dyn Renderer) -> crate::Result<ExitCode> {
    store::reencrypt(path, &keys.resolve()?)?;
    renderer.info(&format!("{} re-encrypted", path.display()));
    Ok(ExitCode::Clean)
}

/// Reveal decrypts `path` and prints every value, plaintext, to stdout.
#[instrument(skip(keys, renderer))]
pub fn reveal(path: &Path, keys: &KeyMaterial, renderer: &dyn Renderer) -> crate::Result<ExitCode> {
    let file = store::read(path, &keys.resolve()?)?;
    for param in &file.params {
        renderer.info(&format!("{}={}", param.key, param.value));
    }
    Ok(ExitCode::Clean)
}

/// Generate_key creates a fresh OpenPGP keypair, printing the armored
/// secret key to stdout and a line noting the public key's fingerprint.
#[instrument(skip_all)]
pub fn generate_key(user_id: &str, passphrase: &str, renderer: &dyn Renderer) -> crate::Result<ExitCode> {
    let (secret_key, public_key) = envelope::generate_keypair(user_id, passphrase)?;
    let armored_secret = secret_key.to_armored_string(None).map_err(tailor_cipher::Error::from)?;
    let armored_public = public_key.to_armored_string(None).map_err(tailor_cipher::Error::from)?;
    renderer.info(&armored_secret);
    renderer.info(&armored_public);
    renderer.info(&format!("fingerprint: {}", envelope::fingerprint_hex(&public_key)));
    Ok(ExitCode::Clean)
}
