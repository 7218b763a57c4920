//! Parameter and ParamFile are the parameter-cipher-store's value types.
use serde::{Deserialize, Serialize};

/// Parameter is a single `KEY=value` (or `KEY.ENC=envelope`) entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Key is the parameter name, without any `.ENC` suffix.
    pub key: String,
    /// Value is the plaintext value. Callers that only have the encrypted
    /// form available (e.g. before decryption) should not construct a
    /// `Parameter` until the value has been decrypted; see `tailor_cipher`.
    pub value: String,
    /// Encrypted records whether this entry's on-disk form is a `.ENC`
    /// envelope rather than a plain value.
    pub encrypted: bool,
}

impl Parameter {
    /// New constructs a plaintext parameter.
    pub fn plain<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            encrypted: false,
        }
    }

    /// Encrypted_key returns the on-disk key for an encrypted parameter,
    /// i.e. the key with the `.ENC` suffix appended.
    pub fn encrypted_key(&self) -> String {
        format!("{}.ENC", self.key)
    }
}

/// ParamFile is the parsed form of a `<TemplateBasename>.env` parameter
/// file: an ordered sequence of parameters plus the trailing public-key
/// fingerprint block.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParamFile {
    /// Params holds every parameter in file order.
    pub params: Vec<Parameter>,
    /// Fingerprints holds the hex public-key fingerprints recorded in the
    /// trailing `#public-key-fingerprints:` comment line, if present.
    pub fingerprints: Vec<String>,
}

impl ParamFile {
    /// Get looks up a parameter by key.
    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.key == key)
    }

    /// Set inserts or replaces a parameter, preserving its position if it
    /// already existed.
    pub fn set(&mut self, param: Parameter) {
        if let Some(existing) = self.params.iter_mut().find(|p| p.key == param.key) {
            *existing = param;
        } else {
            self.params.push(param);
        }
    }
}
