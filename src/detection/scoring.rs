//! Fingerprint scoring.
//!
//! Every signature in the store is searched for in the file content. The
//! alarm level starts at medium (the file already tripped the heuristic) and
//! is only ever raised by fingerprint hits:
//!
//! - the running maximum flag starts at 1 (low)
//! - a hit whose numeric flag exceeds the maximum replaces it
//! - a maximum above the medium flag maps to its label, unmapped values to medium

use crate::core::types::{AlarmLevel, FingerprintHit};
use crate::detection::database::SignatureStore;
use std::sync::Arc;

/// Starting value of the running maximum flag.
const BASELINE_FLAG: i64 = 1;

/// Outcome of scoring one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    /// Final alarm level
    pub alarm: AlarmLevel,
    /// Highest numeric flag seen (at least the baseline)
    pub max_flag: i64,
    /// Fingerprints found, in store order
    pub hits: Vec<FingerprintHit>,
}

/// Resolve the alarm level for a maximum flag value.
pub fn alarm_for(max_flag: i64) -> AlarmLevel {
    if max_flag > AlarmLevel::Medium.flag() {
        AlarmLevel::from_flag_or_medium(max_flag)
    } else {
        AlarmLevel::Medium
    }
}

/// Runs the fingerprint store against file content.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    store: Arc<SignatureStore>,
}

impl ScoringEngine {
    /// Create a scoring engine over a loaded store.
    pub fn new(store: Arc<SignatureStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<SignatureStore> {
        &self.store
    }

    /// Score file content.
    pub fn score(&self, content: &[u8]) -> ScoreResult {
        let mut max_flag = BASELINE_FLAG;
        let mut hits = Vec::new();

        for sig in self.store.iter() {
            if !sig.is_match(content) {
                continue;
            }

            let descriptor = sig.descriptor();
            log::trace!("Fingerprint hit: {} on {:?}", descriptor, sig.pattern_text());

            match descriptor.flag_value() {
                Some(flag) if flag > max_flag => max_flag = flag,
                Some(_) => {}
                None => log::debug!("Fingerprint {} has a non-numeric flag", descriptor),
            }
            hits.push(descriptor.to_hit());
        }

        ScoreResult {
            alarm: alarm_for(max_flag),
            max_flag,
            hits,
        }
    }
}
