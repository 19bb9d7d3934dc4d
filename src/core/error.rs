//! Error types and result handling for shell-sentinel.

use crate::detection::serial::DecodeError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for shell-sentinel operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== I/O Errors =====
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // ===== Configuration Errors =====
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    // ===== Signature Database Errors =====
    #[error("Signature database unavailable: {path}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Signature database is empty")]
    EmptySource,

    #[error("Malformed signature database stream: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid base64 in signature database: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Signature database has unexpected shape: {0}")]
    DatabaseShape(String),

    #[error("Signature descriptor does not match name[rev][flag][type]: {descriptor:?}")]
    DescriptorShape { descriptor: String },

    // ===== Scanning Errors =====
    #[error("Scan worker failed: {0}")]
    Worker(String),

    // ===== Serialization Errors =====
    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),

    // ===== Generic Errors =====
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a source unavailable error.
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create a descriptor shape error.
    pub fn descriptor_shape(descriptor: impl Into<String>) -> Self {
        Self::DescriptorShape {
            descriptor: descriptor.into(),
        }
    }

    /// Check if this error is recoverable (scan can continue).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. }
                | Error::SourceUnavailable { .. }
                | Error::EmptySource
                | Error::Decode(_)
                | Error::Base64(_)
                | Error::DatabaseShape(_)
                | Error::DescriptorShape { .. }
        )
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::PathNotFound(_) => Some("Check that the path exists and is accessible"),
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check your configuration file for syntax errors or missing fields")
            }
            Error::SourceUnavailable { .. } | Error::EmptySource => {
                Some("Pass a signature database with --db; scanning continues with heuristics only")
            }
            Error::Decode(_) | Error::Base64(_) | Error::DatabaseShape(_) => {
                Some("The signature database looks corrupt; download a fresh copy")
            }
            _ => None,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileRead { .. } | Error::PathNotFound(_) | Error::Io(_) => ErrorCategory::Io,

            Error::ConfigLoad(_) | Error::ConfigSave(_) | Error::ConfigInvalid { .. } => {
                ErrorCategory::Configuration
            }

            Error::SourceUnavailable { .. }
            | Error::EmptySource
            | Error::Decode(_)
            | Error::Base64(_)
            | Error::DatabaseShape(_)
            | Error::DescriptorShape { .. } => ErrorCategory::Database,

            Error::Worker(_) => ErrorCategory::Scanning,

            Error::JsonSerialize(_) => ErrorCategory::Serialization,

            Error::Internal(_) => ErrorCategory::Other,
        }
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Database,
    Scanning,
    Serialization,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Database => write!(f, "Database"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Serialization => write!(f, "Serialization"),
            Self::Other => write!(f, "Other"),
        }
    }
}
