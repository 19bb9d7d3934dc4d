//! Fingerprint database loader.
//!
//! The database is a base64 blob wrapping a serialized map of
//! `fingerprint -> "name[rev][flag][type]"`. Fingerprint keys prefixed with
//! `bb:` are themselves base64 encoded. The `version` entry carries the
//! database version and is not a fingerprint.

use crate::core::error::{Error, Result};
use crate::detection::serial::{self, Value};
use crate::detection::signature::{CompiledSignature, SignatureDescriptor};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use std::collections::HashMap;
use std::path::Path;

/// Reserved key holding the database version.
const VERSION_KEY: &[u8] = b"version";

/// Prefix marking a base64-encoded fingerprint key.
const ENCODED_KEY_PREFIX: &[u8] = b"bb:";

/// Standard alphabet, padding optional, stray trailing bits tolerated.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Compiled fingerprints keyed by literal pattern.
///
/// Built once and read-only afterwards; safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct SignatureStore {
    signatures: Vec<CompiledSignature>,
    index: HashMap<Vec<u8>, usize>,
    version: Option<String>,
    skipped: usize,
}

impl SignatureStore {
    /// Create an empty store.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a store from raw database content, returning an empty store on
    /// any failure.
    pub fn load_or_empty(raw: &[u8]) -> Self {
        match Self::try_load(raw) {
            Ok(store) => store,
            Err(e) => {
                log::warn!(
                    "Signature database not loaded ({} error), using heuristics only: {}",
                    e.category(),
                    e
                );
                Self::empty()
            }
        }
    }

    /// Load a store from an optional database path, returning an empty store
    /// when the path is absent or the load fails.
    pub fn load_path_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("No signature database configured, using heuristics only");
            return Self::empty();
        };

        match Self::from_path(path) {
            Ok(store) => store,
            Err(e) => {
                log::warn!(
                    "Signature database not loaded ({} error), using heuristics only: {}",
                    e.category(),
                    e
                );
                Self::empty()
            }
        }
    }

    /// Read and load a database file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).map_err(|e| Error::source_unavailable(path, e))?;
        log::debug!("Read {} bytes of signature database from {:?}", raw.len(), path);
        Self::try_load(&raw)
    }

    /// Load a store from raw database content.
    ///
    /// Individual entries with a malformed key or descriptor are skipped;
    /// everything else is an error.
    pub fn try_load(raw: &[u8]) -> Result<Self> {
        let stream = unwrap_content(raw)?;
        let root = serial::unserialize(&stream)?;
        let pairs = root.as_pairs().ok_or_else(|| {
            Error::DatabaseShape(format!("expected a map at top level, found {}", root.kind()))
        })?;

        let mut store = Self::empty();
        store.version = root.get(VERSION_KEY).and_then(version_string);

        for (key, value) in pairs {
            let Some(key) = key.key_bytes() else {
                log::debug!("Skipping fingerprint with {} key", key.kind());
                store.skipped += 1;
                continue;
            };

            if key == VERSION_KEY {
                continue;
            }

            match compile_entry(&key, value) {
                Ok(sig) => store.insert(sig),
                Err(e) => {
                    log::debug!("Skipping fingerprint entry ({}): {}", e.category(), e);
                    store.skipped += 1;
                }
            }
        }

        log::info!(
            "Loaded {} fingerprints (version {}, {} skipped)",
            store.len(),
            store.version.as_deref().unwrap_or("unknown"),
            store.skipped
        );
        Ok(store)
    }

    /// Insert a signature. A later signature with the same pattern replaces
    /// the earlier one.
    pub fn insert(&mut self, sig: CompiledSignature) {
        if let Some(slot) = self.index.get(sig.pattern()).copied() {
            self.signatures[slot] = sig;
            return;
        }
        self.index.insert(sig.pattern().to_vec(), self.signatures.len());
        self.signatures.push(sig);
    }

    /// Iterate over signatures in load order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledSignature> {
        self.signatures.iter()
    }

    /// Number of signatures.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Whether the store holds no signatures.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Database version, if the database carried one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Number of entries dropped during load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Turn raw database content into a serialized value stream.
///
/// Content that already starts with a map tag is used as is; anything else
/// is treated as base64.
pub fn unwrap_content(raw: &[u8]) -> Result<Vec<u8>> {
    let trimmed = raw.trim_ascii();
    if trimmed.is_empty() {
        return Err(Error::EmptySource);
    }

    if trimmed.len() >= 2 && trimmed[0].to_ascii_lowercase() == b'a' && trimmed[1] == b':' {
        return Ok(trimmed.to_vec());
    }

    decode_base64(trimmed)
}

/// Decode base64 leniently.
///
/// Bytes outside the standard alphabet (line breaks, stray punctuation) are
/// discarded and missing padding is accepted.
pub fn decode_base64(input: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = input
        .iter()
        .copied()
        .filter(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .collect();
    Ok(LENIENT_BASE64.decode(compact)?)
}

fn compile_entry(key: &[u8], value: &Value) -> Result<CompiledSignature> {
    let descriptor = value.as_bytes().ok_or_else(|| {
        Error::DatabaseShape(format!("descriptor is a {}, expected a string", value.kind()))
    })?;
    let descriptor = SignatureDescriptor::parse(&String::from_utf8_lossy(descriptor))?;

    let pattern = match key.strip_prefix(ENCODED_KEY_PREFIX) {
        Some(encoded) => decode_base64(encoded)?,
        None => key.to_vec(),
    };
    if pattern.is_empty() {
        return Err(Error::DatabaseShape(format!(
            "empty fingerprint for {}",
            descriptor
        )));
    }

    CompiledSignature::compile(pattern, descriptor)
}

fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        _ => None,
    }
}
