//! Core type definitions used throughout shell-sentinel.

use crate::core::error::{Error, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Alarm level reported for a scanned file.
///
/// Each level corresponds to a numeric severity flag used by the
/// fingerprint database: `-1` normal, `1` low, `2` medium, `3` high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmLevel {
    Normal,
    Low,
    Medium,
    High,
}

impl AlarmLevel {
    /// All levels, lowest first.
    pub const ALL: [AlarmLevel; 4] = [
        AlarmLevel::Normal,
        AlarmLevel::Low,
        AlarmLevel::Medium,
        AlarmLevel::High,
    ];

    /// Numeric flag value of this level.
    pub fn flag(&self) -> i64 {
        match self {
            AlarmLevel::Normal => -1,
            AlarmLevel::Low => 1,
            AlarmLevel::Medium => 2,
            AlarmLevel::High => 3,
        }
    }

    /// Map a numeric flag to its level, if the flag is on the scale.
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            -1 => Some(AlarmLevel::Normal),
            1 => Some(AlarmLevel::Low),
            2 => Some(AlarmLevel::Medium),
            3 => Some(AlarmLevel::High),
            _ => None,
        }
    }

    /// Map a numeric flag to its level, falling back to `Medium`.
    pub fn from_flag_or_medium(flag: i64) -> Self {
        Self::from_flag(flag).unwrap_or(AlarmLevel::Medium)
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmLevel::Normal => "normal",
            AlarmLevel::Low => "low",
            AlarmLevel::Medium => "medium",
            AlarmLevel::High => "high",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(AlarmLevel::Normal),
            "low" => Some(AlarmLevel::Low),
            "medium" => Some(AlarmLevel::Medium),
            "high" => Some(AlarmLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmLevel::Normal => write!(f, "NORMAL"),
            AlarmLevel::Low => write!(f, "LOW"),
            AlarmLevel::Medium => write!(f, "MEDIUM"),
            AlarmLevel::High => write!(f, "HIGH"),
        }
    }
}

/// A known fingerprint found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintHit {
    /// Name of the tool the fingerprint belongs to
    pub name: String,
    /// Revision / version tag of the fingerprint
    pub rev: String,
    /// File type hint (e.g. "php")
    #[serde(rename = "type")]
    pub file_type: String,
    /// Severity flag token as stored in the database
    pub flag: String,
}

/// Dangerous-function tokens found on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousLine {
    /// Line counter (counts matching lines only, starting at 1)
    pub line: usize,
    /// Matched tokens, in order of appearance
    pub func: Vec<String>,
}

/// Filesystem metadata for a scanned file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path as supplied by the caller
    pub filename: PathBuf,
    /// Size in bytes
    pub filesize: u64,
    /// Status-change time on Unix, creation time elsewhere
    pub created_time: Option<DateTime<Local>>,
    /// Last modification time
    pub last_modified: Option<DateTime<Local>>,
    /// Owning identity as "uid:gid" (empty where unsupported)
    pub owner: String,
    /// Permission bits as three octal digits (e.g. "644")
    pub perm: String,
}

impl FileInfo {
    /// Gather metadata for a file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| Error::file_read(path, e))?;

        let last_modified = metadata.modified().ok().map(DateTime::<Local>::from);
        let (created_time, owner, perm) = platform_details(&metadata);

        Ok(Self {
            filename: path.to_path_buf(),
            filesize: metadata.len(),
            created_time,
            last_modified,
            owner,
            perm,
        })
    }
}

#[cfg(unix)]
fn platform_details(metadata: &std::fs::Metadata) -> (Option<DateTime<Local>>, String, String) {
    use chrono::TimeZone;
    use std::os::unix::fs::MetadataExt;

    let created = Local
        .timestamp_opt(metadata.ctime(), metadata.ctime_nsec().clamp(0, 999_999_999) as u32)
        .single();
    let owner = format!("{}:{}", metadata.uid(), metadata.gid());
    let perm = format!("{:03o}", metadata.mode() & 0o777);
    (created, owner, perm)
}

#[cfg(not(unix))]
fn platform_details(metadata: &std::fs::Metadata) -> (Option<DateTime<Local>>, String, String) {
    let created = metadata.created().ok().map(DateTime::<Local>::from);
    let perm = if metadata.permissions().readonly() {
        "444"
    } else {
        "666"
    };
    (created, String::new(), perm.to_string())
}

/// Analysis result for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Filesystem metadata
    #[serde(flatten)]
    pub info: FileInfo,
    /// Final alarm level
    pub alarm: AlarmLevel,
    /// Per-line dangerous-function matches (empty unless line reporting is on)
    pub suspicious: Vec<SuspiciousLine>,
    /// Known fingerprints found in the file
    pub fingerprint: Vec<FingerprintHit>,
}

impl FileReport {
    /// Path of the analyzed file.
    pub fn path(&self) -> &Path {
        &self.info.filename
    }
}

/// Summary of a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Unique scan identifier
    pub scan_id: String,
    /// When the scan started
    pub start_time: DateTime<Utc>,
    /// When the scan ended
    pub end_time: Option<DateTime<Utc>>,
    /// Number of candidate files examined
    pub files_scanned: u64,
    /// Number of files that produced a report
    pub files_flagged: u64,
    /// Reports per alarm level
    pub normal: u64,
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    /// Reports in input order
    pub reports: Vec<FileReport>,
}

impl Default for ScanSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSummary {
    /// Create a new scan summary.
    pub fn new() -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            end_time: None,
            files_scanned: 0,
            files_flagged: 0,
            normal: 0,
            low: 0,
            medium: 0,
            high: 0,
            reports: Vec::new(),
        }
    }

    /// Record a report.
    pub fn add_report(&mut self, report: FileReport) {
        self.files_flagged += 1;
        match report.alarm {
            AlarmLevel::Normal => self.normal += 1,
            AlarmLevel::Low => self.low += 1,
            AlarmLevel::Medium => self.medium += 1,
            AlarmLevel::High => self.high += 1,
        }
        self.reports.push(report);
    }

    /// Number of reports at the given level.
    pub fn count(&self, level: AlarmLevel) -> u64 {
        match level {
            AlarmLevel::Normal => self.normal,
            AlarmLevel::Low => self.low,
            AlarmLevel::Medium => self.medium,
            AlarmLevel::High => self.high,
        }
    }

    /// Calculate scan duration in milliseconds.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }

    /// Mark the scan as completed.
    pub fn complete(&mut self) {
        self.end_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_alarm_ordering() {
        assert!(AlarmLevel::Normal < AlarmLevel::Low);
        assert!(AlarmLevel::Low < AlarmLevel::Medium);
        assert!(AlarmLevel::Medium < AlarmLevel::High);
    }

    #[test]
    fn test_alarm_flag_scale() {
        for level in AlarmLevel::ALL {
            assert_eq!(AlarmLevel::from_flag(level.flag()), Some(level));
        }
        assert_eq!(AlarmLevel::from_flag(0), None);
        assert_eq!(AlarmLevel::from_flag(7), None);
        assert_eq!(AlarmLevel::from_flag_or_medium(7), AlarmLevel::Medium);
    }

    #[test]
    fn test_alarm_parsing() {
        assert_eq!(AlarmLevel::from_str("HIGH"), Some(AlarmLevel::High));
        assert_eq!(AlarmLevel::from_str("normal"), Some(AlarmLevel::Normal));
        assert_eq!(AlarmLevel::from_str("critical"), None);
        assert_eq!(
            serde_json::to_string(&AlarmLevel::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[test]
    fn test_file_info() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"<?php echo 1; ?>").unwrap();

        let info = FileInfo::from_path(file.path()).unwrap();
        assert_eq!(info.filesize, 16);
        assert_eq!(info.perm.len(), 3);
        assert!(info.last_modified.is_some());

        #[cfg(unix)]
        {
            assert!(info.owner.contains(':'));
            assert!(info.created_time.is_some());
        }
    }

    #[test]
    fn test_file_info_missing() {
        let err = FileInfo::from_path(Path::new("/definitely/not/here.php")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_summary_counts() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();
        let info = FileInfo::from_path(file.path()).unwrap();

        let mut summary = ScanSummary::new();
        summary.add_report(FileReport {
            info: info.clone(),
            alarm: AlarmLevel::High,
            suspicious: Vec::new(),
            fingerprint: Vec::new(),
        });
        summary.add_report(FileReport {
            info,
            alarm: AlarmLevel::Medium,
            suspicious: Vec::new(),
            fingerprint: Vec::new(),
        });
        summary.complete();

        assert_eq!(summary.files_flagged, 2);
        assert_eq!(summary.count(AlarmLevel::High), 1);
        assert_eq!(summary.count(AlarmLevel::Medium), 1);
        assert_eq!(summary.count(AlarmLevel::Low), 0);
        assert!(summary.duration_ms().is_some());
    }
}
