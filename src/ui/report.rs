//! Rendering of scan results for the terminal.

use crate::core::error::Result;
use crate::core::types::{AlarmLevel, FileReport, ScanSummary};
use chrono::{DateTime, Local};
use std::io::Write;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

fn timestamp(time: Option<&DateTime<Local>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Write one file report as text.
pub fn write_report_text<W: Write>(out: &mut W, report: &FileReport) -> Result<()> {
    let info = &report.info;
    writeln!(out, "[{}] {}", report.alarm, info.filename.display())?;
    writeln!(
        out,
        "  size: {} bytes  owner: {}  perm: {}",
        info.filesize,
        if info.owner.is_empty() { "-" } else { info.owner.as_str() },
        info.perm
    )?;
    writeln!(
        out,
        "  created: {}  modified: {}",
        timestamp(info.created_time.as_ref()),
        timestamp(info.last_modified.as_ref())
    )?;

    for hit in &report.fingerprint {
        writeln!(
            out,
            "  fingerprint: {} (rev {}, type {}, flag {})",
            hit.name, hit.rev, hit.file_type, hit.flag
        )?;
    }

    for line in &report.suspicious {
        writeln!(out, "  line {}: {}", line.line, line.func.join(", "))?;
    }

    Ok(())
}

/// Write the totals of a scan as text.
pub fn write_summary_text<W: Write>(out: &mut W, summary: &ScanSummary) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "=== Scan Complete ===")?;
    writeln!(out, "Scan ID:         {}", summary.scan_id)?;
    writeln!(out, "Files Scanned:   {}", summary.files_scanned)?;
    writeln!(out, "Files Flagged:   {}", summary.files_flagged)?;
    for level in AlarmLevel::ALL.iter().rev() {
        writeln!(out, "  {:<14} {}", format!("{}:", level), summary.count(*level))?;
    }
    if let Some(ms) = summary.duration_ms() {
        writeln!(out, "Duration:        {} ms", ms)?;
    }
    Ok(())
}

/// Write a whole scan in the requested format.
pub fn write_scan<W: Write>(out: &mut W, summary: &ScanSummary, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, summary)?;
            writeln!(out)?;
            Ok(())
        }
        ReportFormat::Text => {
            for report in &summary.reports {
                write_report_text(out, report)?;
                writeln!(out)?;
            }
            write_summary_text(out, summary)
        }
    }
}
