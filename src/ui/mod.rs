//! User interface components.
//!
//! This module provides:
//! - CLI argument definitions
//! - Text and JSON rendering of scan results

pub mod cli;
pub mod report;

pub use cli::Cli;
pub use report::{write_scan, ReportFormat};
