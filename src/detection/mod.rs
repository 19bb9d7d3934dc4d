//! Web-shell detection engines.
//!
//! This module provides:
//! - Typed-value stream decoding for the fingerprint database
//! - Fingerprint database loading and compilation
//! - The dangerous-function heuristic
//! - Fingerprint scoring and alarm levels

pub mod database;
pub mod heuristic;
pub mod scoring;
pub mod serial;
pub mod signature;

pub use database::SignatureStore;
pub use heuristic::HeuristicMatcher;
pub use scoring::{ScoreResult, ScoringEngine};
pub use serial::{DecodeError, Value};
pub use signature::{CompiledSignature, SignatureDescriptor};
