//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// shell-sentinel: find web shells by dangerous functions and known fingerprints
#[derive(Parser, Debug)]
#[command(name = "shell-sentinel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine processing
    Json,
}

impl From<OutputFormat> for crate::ui::report::ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan files or directories for web shells
    Scan {
        /// File or directory to scan (repeatable)
        #[arg(short, long, required = true)]
        path: Vec<PathBuf>,

        /// Comma-separated file extensions to scan (e.g. php,txt,asp)
        #[arg(short, long)]
        extension: Option<String>,

        /// Show the line of each suspicious function
        #[arg(short, long, overrides_with = "no_line")]
        line: bool,

        /// Do not report suspicious lines
        #[arg(long, overrides_with = "line")]
        no_line: bool,

        /// Local fingerprint database file
        #[arg(short, long)]
        db: Option<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Number of scan workers
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show application information
    Info,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print configuration file location
    Path,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
