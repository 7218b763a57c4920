//! Envelope wraps a single parameter value in a hybrid OpenPGP message: a
//! random session key encrypts the value, and the session key is wrapped
//! once per recipient public key. The wire format is produced and consumed
//! by the `pgp` crate so any standard OpenPGP implementation can decrypt a
//! value this store wrote, and vice versa.
use std::io::Cursor;

use base64::Engine;
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use pgp::ser::Serialize as _;
use pgp::types::{KeyTrait, SecretKeyTrait};
use pgp::{Deserializable, KeyType, Message, SecretKeyParamsBuilder, SignedPublicKey, SignedSecretKey};
use rand::thread_rng;

use crate::{Error, Result};

/// Seal encrypts `plaintext` for every key in `recipients`, returning the
/// base64 text stored as a `.ENC` value.
pub fn seal(plaintext: &str, recipients: &[SignedPublicKey]) -> Result<String> {
    if recipients.is_empty() {
        return Err(Error::NoRecipients);
    }
    let refs: Vec<&SignedPublicKey> = recipients.iter().collect();
    let message = Message::new_literal("value", plaintext);
    let mut rng = thread_rng();
    let encrypted = message.encrypt_to_keys(&mut rng, SymmetricKeyAlgorithm::AES256, &refs)?;
    let bytes = encrypted.to_bytes()?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Open decrypts a base64 envelope produced by [`seal`] using `key`. Any
/// failure (malformed envelope, wrong key, wrong passphrase) is reported
/// as [`Error::KeyMismatch`].
pub fn open(envelope_b64: &str, key: &SignedSecretKey, passphrase: &str) -> Result<String> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(envelope_b64)
        .map_err(|e| Error::KeyMismatch(e.to_string()))?;
    let message = Message::from_bytes(Cursor::new(raw)).map_err(|e| Error::KeyMismatch(e.to_string()))?;
    let (decryptor, _) = message
        .decrypt(|| passphrase.to_string(), &[key])
        .map_err(|e| Error::KeyMismatch(e.to_string()))?;
    for candidate in decryptor {
        let decrypted = candidate.map_err(|e| Error::KeyMismatch(e.to_string()))?;
        if let Some(content) = decrypted
            .get_content()
            .map_err(|e| Error::KeyMismatch(e.to_string()))?
        {
            return String::from_utf8(content).map_err(|e| Error::KeyMismatch(e.to_string()));
        }
    }
    Err(Error::KeyMismatch("envelope carried no literal data packet".into()))
}

/// Load_public_key parses one armored OpenPGP public key.
pub fn load_public_key(armored: &str) -> Result<SignedPublicKey> {
    let (key, _) = SignedPublicKey::from_armor_single(Cursor::new(armored.as_bytes()))?;
    Ok(key)
}

/// Load_secret_key parses one armored OpenPGP secret key.
pub fn load_secret_key(armored: &str) -> Result<SignedSecretKey> {
    let (key, _) = SignedSecretKey::from_armor_single(Cursor::new(armored.as_bytes()))?;
    Ok(key)
}

/// Fingerprint_hex returns the hex fingerprint recorded in a parameter
/// file's `#public-key-fingerprints:` line for this key.
pub fn fingerprint_hex(key: &SignedPublicKey) -> String {
    key.fingerprint().iter().map(|b| format!("{b:02X}")).collect()
}

/// Generate_keypair creates a fresh OpenPGP keypair for `secrets
/// generate-key`: an RSA-3072 signing-and-encrypting key bound to
/// `user_id`, its secret half locked with `passphrase` (empty for an
/// unprotected key).
pub fn generate_keypair(user_id: &str, passphrase: &str) -> Result<(SignedSecretKey, SignedPublicKey)> {
    let params = SecretKeyParamsBuilder::default()
        .key_type(KeyType::Rsa(3072))
        .can_create_certificates(true)
        .can_sign(true)
        .can_encrypt(true)
        .primary_user_id(user_id.to_string())
        .passphrase((!passphrase.is_empty()).then(|| passphrase.to_string()))
        .build()
        .map_err(|e| Error::KeyMismatch(e.to_string()))?;

    let passwd = || passphrase.to_string();
    let secret_key = params.generate()?.sign(passwd)?;
    let public_key = secret_key.public_key().sign(&secret_key, passwd)?;
    Ok((secret_key, public_key))
}
