//! Candidate file discovery.
//!
//! Turns user-supplied paths into the ordered file list the scanner consumes.
//! Only files whose extension is configured are kept.

use crate::core::config::ScanConfig;
use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collects candidate files from files and directories.
#[derive(Debug, Clone)]
pub struct FileCollector {
    config: ScanConfig,
}

impl FileCollector {
    /// Create a collector from scan settings.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Collect candidates under a single path.
    ///
    /// A file is returned only if its extension matches. A directory yields
    /// its matching files in sorted path order, descending into
    /// subdirectories only when recursion is enabled.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }

        if root.is_file() {
            let keep = self.accepts(root);
            if !keep {
                log::debug!("Skipping {:?}: extension not in scan list", root);
            }
            return Ok(if keep { vec![root.to_path_buf()] } else { Vec::new() });
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(max_depth);

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_file() && self.accepts(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        log::debug!("Collected {} candidate files under {:?}", files.len(), root);
        Ok(files)
    }

    /// Collect candidates under several paths, keeping the given path order.
    pub fn collect_all(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for root in roots {
            files.extend(self.collect(root)?);
        }
        Ok(files)
    }

    /// Whether a file passes the extension and size filters.
    fn accepts(&self, path: &Path) -> bool {
        if !self.config.matches_extension(path) {
            return false;
        }

        match path.metadata() {
            Ok(metadata) if self.exceeds_size_limit(metadata.len()) => {
                log::debug!("Skipping {:?}: larger than {} MB", path, self.config.skip_large_files_mb);
                false
            }
            Ok(_) => true,
            // Unreadable metadata is left for the analyzer to absorb.
            Err(_) => true,
        }
    }

    fn exceeds_size_limit(&self, size: u64) -> bool {
        size > self.config.skip_large_files_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_single_file_extension_filter() {
        let dir = tempdir().unwrap();
        let php = dir.path().join("shell.php");
        let png = dir.path().join("logo.png");
        touch(&php, "<?php ?>");
        touch(&png, "png");

        let collector = FileCollector::new(ScanConfig::default());
        assert_eq!(collector.collect(&php).unwrap(), vec![php.clone()]);
        assert!(collector.collect(&png).unwrap().is_empty());
    }

    #[test]
    fn test_directory_sorted_and_flat() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b.php"), "b");
        touch(&dir.path().join("a.txt"), "a");
        touch(&dir.path().join("c.css"), "c");
        touch(&dir.path().join("sub").join("d.php"), "d");

        let collector = FileCollector::new(ScanConfig::default());
        let files = collector.collect(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b.php")]
        );
    }

    #[test]
    fn test_recursive_collection() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("z.php"), "z");
        touch(&dir.path().join("sub").join("deep").join("x.asp"), "x");

        let config = ScanConfig {
            recursive: true,
            ..ScanConfig::default()
        };
        let files = FileCollector::new(config).collect(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("sub").join("deep").join("x.asp"),
                dir.path().join("z.php"),
            ]
        );
    }

    #[test]
    fn test_size_limit() {
        let dir = tempdir().unwrap();
        let big = dir.path().join("big.php");
        fs::write(&big, vec![b'a'; 1024 * 1024 + 1]).unwrap();
        let small = dir.path().join("small.php");
        touch(&small, "eval");

        let config = ScanConfig {
            skip_large_files_mb: 1,
            ..ScanConfig::default()
        };
        let files = FileCollector::new(config).collect(dir.path()).unwrap();
        assert_eq!(files, vec![small]);
    }

    #[test]
    fn test_missing_path() {
        let collector = FileCollector::new(ScanConfig::default());
        let err = collector.collect(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn test_collect_all_keeps_root_order() {
        let dir = tempdir().unwrap();
        let second = dir.path().join("second.php");
        let first = dir.path().join("first.php");
        touch(&second, "2");
        touch(&first, "1");

        let collector = FileCollector::new(ScanConfig::default());
        let files = collector.collect_all(&[second.clone(), first.clone()]).unwrap();
        assert_eq!(files, vec![second, first]);
    }
}
