//! Fingerprint signature types.
//!
//! A database entry maps a literal code fragment to a descriptor string of
//! the form `name[rev][flag][type]`, e.g. `c99shell[v1.0][3][php]`.

use crate::core::error::{Error, Result};
use crate::core::types::FingerprintHit;
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DESCRIPTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\[(.+?)\]\[(.+?)\]\[(.+?)\]").expect("valid descriptor regex")
});

/// Parsed `name[rev][flag][type]` descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDescriptor {
    /// Tool name
    pub name: String,
    /// Revision tag
    pub rev: String,
    /// Severity flag token
    pub flag: String,
    /// File type hint
    #[serde(rename = "type")]
    pub file_type: String,
}

impl SignatureDescriptor {
    /// Parse a descriptor string.
    ///
    /// Only the leading `name[rev][flag][type]` is significant; anything that
    /// follows the fourth group is ignored.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let caps = DESCRIPTOR_RE
            .captures(descriptor)
            .ok_or_else(|| Error::descriptor_shape(descriptor))?;

        Ok(Self {
            name: caps[1].to_string(),
            rev: caps[2].to_string(),
            flag: caps[3].to_string(),
            file_type: caps[4].to_string(),
        })
    }

    /// Numeric value of the flag token, if it is an integer.
    pub fn flag_value(&self) -> Option<i64> {
        self.flag.trim().parse().ok()
    }

    /// Build the hit record reported for a match.
    pub fn to_hit(&self) -> FingerprintHit {
        FingerprintHit {
            name: self.name.clone(),
            rev: self.rev.clone(),
            file_type: self.file_type.clone(),
            flag: self.flag.clone(),
        }
    }
}

impl std::fmt::Display for SignatureDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}][{}][{}]", self.name, self.rev, self.flag, self.file_type)
    }
}

/// A fingerprint compiled for matching.
#[derive(Debug, Clone)]
pub struct CompiledSignature {
    pattern: Vec<u8>,
    matcher: BytesRegex,
    descriptor: SignatureDescriptor,
}

impl CompiledSignature {
    /// Compile a literal pattern.
    ///
    /// The pattern is escaped so every byte matches itself. Patterns that are
    /// not valid UTF-8 are compiled byte-for-byte.
    pub fn compile(pattern: Vec<u8>, descriptor: SignatureDescriptor) -> Result<Self> {
        let source = match std::str::from_utf8(&pattern) {
            Ok(text) => regex::escape(text),
            Err(_) => {
                let mut escaped = String::from("(?-u)");
                for byte in &pattern {
                    escaped.push_str(&format!("\\x{:02x}", byte));
                }
                escaped
            }
        };

        let matcher = BytesRegex::new(&source).map_err(|e| {
            Error::Internal(format!(
                "Failed to compile fingerprint {}: {}",
                descriptor, e
            ))
        })?;

        Ok(Self {
            pattern,
            matcher,
            descriptor,
        })
    }

    /// Raw pattern bytes.
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Pattern as text, lossily decoded.
    pub fn pattern_text(&self) -> String {
        String::from_utf8_lossy(&self.pattern).into_owned()
    }

    /// Parsed descriptor.
    pub fn descriptor(&self) -> &SignatureDescriptor {
        &self.descriptor
    }

    /// Check whether the pattern occurs anywhere in `content`.
    pub fn is_match(&self, content: &[u8]) -> bool {
        self.matcher.is_match(content)
    }
}
