//! Paramfile implements the line-oriented parameter-file grammar:
//! `KEY=value`, `KEY.ENC=envelope`, blank lines, `#` comments, and a
//! trailing `#public-key-fingerprints:` line. Parsing keeps enough of the
//! original layout that writing an unmodified file back out reproduces it
//! byte-for-byte.
use crate::{Error, Result};

const FINGERPRINT_PREFIX: &str = "#public-key-fingerprints:";

/// RawParam is one `KEY=value` or `KEY.ENC=envelope` line, before any
/// decryption has happened.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawParam {
    /// Key is the parameter name, without the `.ENC` suffix.
    pub key: String,
    /// Raw_value is the value exactly as it appears on disk: plaintext for
    /// an unencrypted entry, base64 envelope text for an encrypted one.
    pub raw_value: String,
    /// Encrypted records whether this line carried the `.ENC` suffix.
    pub encrypted: bool,
}

/// Line is one physical line of a parameter file, retaining enough
/// structure to reproduce the original text exactly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Line {
    /// An empty line.
    Blank,
    /// A `#`-prefixed comment line, other than the fingerprint line.
    Comment(String),
    /// The trailing `#public-key-fingerprints:` line.
    Fingerprints(Vec<String>),
    /// A parameter assignment.
    Param(RawParam),
}

/// RawFile is a parsed parameter file: its lines, in original order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawFile {
    /// Lines holds every line of the file, including blanks and comments.
    pub lines: Vec<Line>,
}

impl RawFile {
    /// Parse splits `text` into a [`RawFile`], failing on a line that looks
    /// like an assignment but has no `=`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for raw_line in text.lines() {
            let trimmed = raw_line.trim_end();
            if trimmed.is_empty() {
                lines.push(Line::Blank);
            } else if let Some(rest) = trimmed.strip_prefix(FINGERPRINT_PREFIX) {
                let fps = rest
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                lines.push(Line::Fingerprints(fps));
            } else if let Some(comment) = trimmed.strip_prefix('#') {
                lines.push(Line::Comment(comment.to_string()));
            } else {
                let (raw_key, raw_value) = trimmed
                    .split_once('=')
                    .ok_or_else(|| Error::MalformedParamFile(raw_line.to_string()))?;
                let (key, encrypted) = match raw_key.strip_suffix(".ENC") {
                    Some(k) => (k.to_string(), true),
                    None => (raw_key.to_string(), false),
                };
                lines.push(Line::Param(RawParam {
                    key,
                    raw_value: raw_value.to_string(),
                    encrypted,
                }));
            }
        }
        Ok(Self { lines })
    }

    /// Render reproduces the on-disk text for this file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Blank => {}
                Line::Comment(c) => {
                    out.push('#');
                    out.push_str(c);
                }
                Line::Fingerprints(fps) => {
                    out.push_str(FINGERPRINT_PREFIX);
                    out.push(' ');
                    out.push_str(&fps.join(","));
                }
                Line::Param(p) => {
                    out.push_str(&p.key);
                    if p.encrypted {
                        out.push_str(".ENC");
                    }
                    out.push('=');
                    out.push_str(&p.raw_value);
                }
            }
            out.push('\n');
        }
        out
    }

    /// Params iterates over every parameter line, in file order.
    pub fn params(&self) -> impl Iterator<Item = &RawParam> {
        self.lines.iter().filter_map(|l| match l {
            Line::Param(p) => Some(p),
            _ => None,
        })
    }

    /// Fingerprints returns the recorded public-key fingerprints, if any.
    pub fn fingerprints(&self) -> Vec<String> {
        self.lines
            .iter()
            .find_map(|l| match l {
                Line::Fingerprints(fps) => Some(fps.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Set_param replaces an existing parameter's value in place, or
    /// appends a new one before the fingerprint line (or at the end, if
    /// there is none).
    pub fn set_param(&mut self, param: RawParam) {
        if let Some(pos) = self.lines.iter().position(
            |l| matches!(l, Line::Param(p) if p.key == param.key),
        ) {
            self.lines[pos] = Line::Param(param);
            return;
        }
        let insert_at = self
            .lines
            .iter()
            .position(|l| matches!(l, Line::Fingerprints(_)))
            .unwrap_or(self.lines.len());
        self.lines.insert(insert_at, Line::Param(param));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# env: staging\nNAMESPACE=myapp-staging\nPASSWORD.ENC=aGVsbG8=\n\n#public-key-fingerprints: ABCD1234,EF567890\n";

    #[test]
    fn parse_then_render_is_byte_identical() {
        let file = RawFile::parse(SAMPLE).unwrap();
        assert_eq!(file.render(), SAMPLE);
    }

    #[test]
    fn distinguishes_plain_and_encrypted_entries() {
        let file = RawFile::parse(SAMPLE).unwrap();
        let params: Vec<_> = file.params().collect();
        assert_eq!(params[0].key, "NAMESPACE");
        assert!(!params[0].encrypted);
        assert_eq!(params[1].key, "PASSWORD");
        assert!(params[1].encrypted);
    }

    #[test]
    fn reads_fingerprint_line() {
        let file = RawFile::parse(SAMPLE).unwrap();
        assert_eq!(file.fingerprints(), vec!["ABCD1234", "EF567890"]);
    }

    #[test]
    fn malformed_line_is_rejected() {
        assert!(RawFile::parse("not-an-assignment").is_err());
    }

    #[test]
    fn set_param_preserves_position_on_update() {
        let mut file = RawFile::parse(SAMPLE).unwrap();
        file.set_param(RawParam {
            key: "NAMESPACE".into(),
            raw_value: "myapp-prod".into(),
            encrypted: false,
        });
        assert_eq!(file.params().next().unwrap().raw_value, "myapp-prod");
    }
}
