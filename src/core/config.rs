//! Configuration management for shell-sentinel.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scan-related settings
    #[serde(default)]
    pub scan: ScanConfig,
    /// Signature database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigLoad(format!("Failed to read config file: {}", e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigLoad(format!("Failed to parse config file: {}", e))
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigSave(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, contents).map_err(|e| {
            Error::ConfigSave(format!("Failed to write config file: {}", e))
        })
    }

    /// Load configuration from the default location.
    ///
    /// A missing file gives the defaults. A file that cannot be loaded also
    /// gives the defaults, together with the load error so the caller can
    /// report it once logging is up.
    pub fn load_or_default() -> (Self, Option<Error>) {
        let config_path = Self::default_config_path();

        if !config_path.exists() {
            return (Self::default(), None);
        }

        match Self::load(&config_path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// Get the application data directory.
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("shell-sentinel")
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.scan.extensions.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "scan.extensions".to_string(),
                message: "At least one extension is required".to_string(),
            });
        }

        if self.scan.skip_large_files_mb == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.skip_large_files_mb".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.scan.scan_threads == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.scan_threads".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if log_level_is_unknown(&self.logging.log_level) {
            return Err(Error::ConfigInvalid {
                field: "logging.log_level".to_string(),
                message: format!("Unknown level '{}'", self.logging.log_level),
            });
        }

        Ok(())
    }
}

fn log_level_is_unknown(level: &str) -> bool {
    !matches!(
        level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "warning" | "error"
    )
}

/// Scan-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions to scan (without the dot)
    pub extensions: Vec<String>,
    /// Report dangerous-function matches per line
    pub show_line: bool,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Skip files larger than this size (MB)
    pub skip_large_files_mb: u64,
    /// Number of parallel scan workers
    pub scan_threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ["php", "asp", "txt", "jsp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            show_line: true,
            recursive: false,
            follow_symlinks: false,
            skip_large_files_mb: 50,
            scan_threads: num_cpus(),
        }
    }
}

impl ScanConfig {
    /// Replace the extension list from a comma-separated string.
    pub fn set_extensions(&mut self, list: &str) {
        self.extensions = list
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    /// Check whether a path has one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}

/// Signature database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Local fingerprint database; none means heuristics only
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Get the number of CPUs, with a reasonable default.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan.extensions, vec!["php", "asp", "txt", "jsp"]);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("test_config.json");

        let mut config = Config::default();
        config.database.path = Some(PathBuf::from("/srv/shells.db"));
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.scan.skip_large_files_mb, config.scan.skip_large_files_mb);
        assert_eq!(loaded.database.path, config.database.path);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"scan": {"recursive": true}}"#).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!(loaded.scan.recursive);
        assert!(loaded.scan.show_line);
        assert_eq!(loaded.logging.log_level, "info");
    }

    #[test]
    fn test_invalid_config() {
        let mut config = Config::default();
        config.scan.skip_large_files_mb = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.log_level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_extension_list() {
        let mut scan = ScanConfig::default();
        scan.set_extensions(" php, .ASP ,,txt");
        assert_eq!(scan.extensions, vec!["php", "asp", "txt"]);

        assert!(scan.matches_extension(Path::new("/www/shell.PHP")));
        assert!(scan.matches_extension(Path::new("notes.txt")));
        assert!(!scan.matches_extension(Path::new("image.png")));
        assert!(!scan.matches_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/no/such/config.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }
}
