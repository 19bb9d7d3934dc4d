//! shell-sentinel: a web-shell detector.
//!
//! Files are first screened with a dangerous-function heuristic. Files that
//! trip it are scored against a database of known web-shell fingerprints,
//! producing one [`FileReport`] per suspicious file with an alarm level.

pub mod core;
pub mod detection;
pub mod scanner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
pub use crate::detection::{HeuristicMatcher, ScoringEngine, SignatureStore};
pub use crate::scanner::{FileCollector, WebshellScanner};
