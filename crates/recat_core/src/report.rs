//! Batch outcome accounting.

use crate::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub document: Document,
    pub status: FileStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub document: Document,
    pub message: String,
}

/// Accumulated outcome of one batch run.
///
/// `total` is fixed at construction. The counters only move through the
/// `record_*` methods, which keeps `processed == successful + skipped +
/// failed` true at all times. Entries land in completion order, not input
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    total: usize,
    processed: usize,
    successful: usize,
    skipped: usize,
    failed: usize,
    errors: Vec<ErrorEntry>,
    file_results: Vec<FileResult>,
}

impl BatchResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            successful: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            file_results: Vec::new(),
        }
    }

    /// The store accepted a changed body for this document.
    pub fn record_success(&mut self, document: Document) {
        self.processed += 1;
        self.successful += 1;
        self.file_results.push(FileResult {
            document,
            status: FileStatus::Success,
            message: "categories updated".to_string(),
        });
    }

    /// The proposed change was already satisfied; nothing was written.
    pub fn record_skipped(&mut self, document: Document) {
        self.processed += 1;
        self.skipped += 1;
        self.file_results.push(FileResult {
            document,
            status: FileStatus::Skipped,
            message: "no change needed".to_string(),
        });
    }

    /// The document failed permanently; the run continues without it.
    pub fn record_failure(&mut self, document: Document, message: impl Into<String>) {
        let message = message.into();
        self.processed += 1;
        self.failed += 1;
        self.errors.push(ErrorEntry {
            document: document.clone(),
            message: message.clone(),
        });
        self.file_results.push(FileResult {
            document,
            status: FileStatus::Failed,
            message,
        });
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn file_results(&self) -> &[FileResult] {
        &self.file_results
    }

    /// Completion percentage in `0..=100`; an empty run counts as done.
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }

    /// One-line rendering for logs and terminal output.
    pub fn summary_line(&self) -> String {
        format!(
            "{} succeeded, {} unchanged, {} failed out of {}",
            self.successful, self.skipped, self.failed, self.total
        )
    }
}
