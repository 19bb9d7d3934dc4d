//! File discovery and web-shell scanning.
//!
//! This module provides:
//! - Candidate collection by extension, size and recursion settings
//! - Per-file analysis combining the heuristic with fingerprint scoring
//! - A parallel scan loop producing a [`ScanSummary`](crate::core::types::ScanSummary)

pub mod discovery;
pub mod file;

pub use discovery::FileCollector;
pub use file::WebshellScanner;
