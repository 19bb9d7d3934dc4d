//! Per-file analysis and the scan loop.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{FileInfo, FileReport, ScanSummary};
use crate::detection::{HeuristicMatcher, ScoringEngine, SignatureStore};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Result sent back from a worker task.
#[derive(Debug)]
enum WorkerResult {
    /// The file produced a report
    Flagged { index: usize, report: FileReport },
    /// The file was analyzed and produced nothing
    Clean { index: usize },
}

/// Web-shell scanner.
///
/// Cheap to clone: the signature store is shared read-only between clones.
#[derive(Debug, Clone)]
pub struct WebshellScanner {
    heuristic: HeuristicMatcher,
    scoring: ScoringEngine,
    show_line: bool,
    scan_threads: usize,
}

impl WebshellScanner {
    /// Create a scanner over a loaded signature store with default settings.
    pub fn new(store: Arc<SignatureStore>) -> Self {
        Self::from_config(&Config::default(), store)
    }

    /// Create a scanner using the scan settings from `config`.
    pub fn from_config(config: &Config, store: Arc<SignatureStore>) -> Self {
        Self {
            heuristic: HeuristicMatcher::new(),
            scoring: ScoringEngine::new(store),
            show_line: config.scan.show_line,
            scan_threads: config.scan.scan_threads,
        }
    }

    /// Enable or disable per-line reporting.
    pub fn with_show_line(mut self, show_line: bool) -> Self {
        self.show_line = show_line;
        self
    }

    /// Set the number of worker tasks used by [`scan`](Self::scan).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.scan_threads = threads;
        self
    }

    /// The signature store in use.
    pub fn store(&self) -> &Arc<SignatureStore> {
        self.scoring.store()
    }

    /// Analyze one file, surfacing read errors.
    ///
    /// Returns `Ok(None)` for empty files and for files without any
    /// dangerous-function match; such files are never scored.
    pub fn try_analyze(&self, path: &Path) -> Result<Option<FileReport>> {
        let content = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
        if content.is_empty() {
            log::trace!("{:?} is empty", path);
            return Ok(None);
        }

        if !self.heuristic.has_match(&content) {
            log::trace!("{:?} has no dangerous functions", path);
            return Ok(None);
        }

        let info = FileInfo::from_path(path)?;
        let suspicious = if self.show_line {
            self.heuristic.find_by_line(&content)
        } else {
            Vec::new()
        };
        let score = self.scoring.score(&content);

        log::debug!(
            "{:?}: alarm {} ({} fingerprint hits)",
            path,
            score.alarm,
            score.hits.len()
        );

        Ok(Some(FileReport {
            info,
            alarm: score.alarm,
            suspicious,
            fingerprint: score.hits,
        }))
    }

    /// Analyze one file. Unreadable files produce no report.
    pub fn analyze(&self, path: &Path) -> Option<FileReport> {
        match self.try_analyze(path) {
            Ok(report) => report,
            Err(e) if e.is_recoverable() => {
                log::debug!("Skipping {:?} ({} error): {}", path, e.category(), e);
                None
            }
            Err(e) => {
                log::warn!("Skipping {:?} ({} error): {}", path, e.category(), e);
                None
            }
        }
    }

    /// Lazily analyze files in order, yielding only the ones with a report.
    pub fn analyze_all<'a>(&'a self, paths: &'a [PathBuf]) -> impl Iterator<Item = FileReport> + 'a {
        paths.iter().filter_map(move |path| self.analyze(path))
    }

    /// Analyze files on a pool of worker tasks.
    ///
    /// Reports come back in input order, matching [`analyze_all`](Self::analyze_all).
    pub async fn scan(&self, paths: Vec<PathBuf>) -> Result<ScanSummary> {
        let mut summary = ScanSummary::new();
        let total = paths.len();
        log::info!("Scanning {} files", total);

        let file_queue: Arc<Mutex<VecDeque<(usize, PathBuf)>>> =
            Arc::new(Mutex::new(paths.into_iter().enumerate().collect()));

        let (tx, mut rx) = mpsc::channel::<WorkerResult>(1000);

        let num_workers = self.scan_threads.clamp(1, total.max(1));
        let mut handles = Vec::with_capacity(num_workers);

        for _ in 0..num_workers {
            let queue = Arc::clone(&file_queue);
            let scanner = self.clone();
            let tx = tx.clone();

            let handle = tokio::spawn(async move {
                loop {
                    let item = {
                        match queue.lock() {
                            Ok(mut q) => q.pop_front(),
                            Err(_) => {
                                log::error!("File queue lock poisoned in worker");
                                break;
                            }
                        }
                    };

                    let Some((index, path)) = item else {
                        break;
                    };

                    let result = match scanner.analyze(&path) {
                        Some(report) => WorkerResult::Flagged { index, report },
                        None => WorkerResult::Clean { index },
                    };
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
            });

            handles.push(handle);
        }

        // Drop the sender so the channel closes when workers finish
        drop(tx);

        let mut slots: Vec<Option<FileReport>> = (0..total).map(|_| None).collect();
        while let Some(result) = rx.recv().await {
            summary.files_scanned += 1;
            match result {
                WorkerResult::Flagged { index, report } => {
                    log::info!("Flagged {:?} ({})", report.path(), report.alarm);
                    slots[index] = Some(report);
                }
                WorkerResult::Clean { index } => {
                    log::trace!("File #{} clean", index);
                }
            }
        }

        for handle in handles {
            handle
                .await
                .map_err(|e| Error::Worker(format!("scan worker failed: {}", e)))?;
        }

        if summary.files_scanned as usize != total {
            return Err(Error::Worker(format!(
                "{} of {} files were not analyzed",
                total - summary.files_scanned as usize,
                total
            )));
        }

        for report in slots.into_iter().flatten() {
            summary.add_report(report);
        }
        summary.complete();

        log::info!(
            "Scan completed: {} files scanned, {} flagged ({} high, {} medium)",
            summary.files_scanned,
            summary.files_flagged,
            summary.high,
            summary.medium
        );

        Ok(summary)
    }
}
