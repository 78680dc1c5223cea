use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use recat_core::{BatchResult, FileStatus};
use recat_logging::{engine_error, engine_info};
use serde::Serialize;

const REPORT_FILENAME: &str = "recat_report.ron";

#[derive(Debug, Clone, Serialize)]
struct ReportEntry {
    title: String,
    status: String,
    message: String,
}

#[derive(Debug, Clone, Serialize)]
struct RunReport {
    finished_utc: String,
    total: usize,
    processed: usize,
    successful: usize,
    skipped: usize,
    failed: usize,
    entries: Vec<ReportEntry>,
}

/// Write a RON run report next to the working directory. Failures are
/// logged, never fatal.
pub(crate) fn save_report(dir: &Path, result: &BatchResult) -> Option<PathBuf> {
    let report = RunReport {
        finished_utc: Utc::now().to_rfc3339(),
        total: result.total(),
        processed: result.processed(),
        successful: result.successful(),
        skipped: result.skipped(),
        failed: result.failed(),
        entries: result
            .file_results()
            .iter()
            .map(|entry| ReportEntry {
                title: entry.document.title.clone(),
                status: status_label(entry.status).to_string(),
                message: entry.message.clone(),
            })
            .collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&report, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize run report: {}", err);
            return None;
        }
    };

    let path = dir.join(REPORT_FILENAME);
    match fs::write(&path, content) {
        Ok(()) => {
            engine_info!("Run report written to {:?}", path);
            Some(path)
        }
        Err(err) => {
            engine_error!("Failed to write run report to {:?}: {}", path, err);
            None
        }
    }
}

fn status_label(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Success => "success",
        FileStatus::Skipped => "skipped",
        FileStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::save_report;
    use recat_core::{BatchResult, Document};

    #[test]
    fn report_lists_every_recorded_outcome() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut result = BatchResult::new(2);
        result.record_success(Document::new("One", 1));
        result.record_failure(Document::new("Two", 2), "target does not exist: Two");

        let path = save_report(dir.path(), &result).expect("report written");
        let content = std::fs::read_to_string(path).expect("read report");

        assert!(content.contains("\"One\""));
        assert!(content.contains("\"success\""));
        assert!(content.contains("\"failed\""));
        assert!(content.contains("target does not exist: Two"));
    }
}
