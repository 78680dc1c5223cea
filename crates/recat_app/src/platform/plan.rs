use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// One batch run described in a RON file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunPlan {
    /// `api.php`-style endpoint of the document store.
    pub endpoint: String,
    /// Titles to operate on, in run order.
    pub titles: Vec<String>,
    /// Categories to add / remove on every selected document.
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
    /// Titles to leave deselected even though they are listed.
    #[serde(default)]
    pub skip: Vec<String>,
    /// Retry rate-limited edits after the backoff instead of dropping them.
    #[serde(default)]
    pub retry_on_rate_limit: bool,
}

#[derive(Debug, Error)]
pub(crate) enum PlanError {
    #[error("cannot read plan file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse plan file: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

pub(crate) fn load_plan(path: &Path) -> Result<RunPlan, PlanError> {
    let content = fs::read_to_string(path)?;
    Ok(ron::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::{load_plan, PlanError};
    use std::io::Write;

    #[test]
    fn loads_a_full_plan() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"(
                endpoint: "https://wiki.example/api.php",
                titles: ["One", "Two"],
                add: ["Ships"],
                remove: ["Boats"],
                skip: ["Two"],
                retry_on_rate_limit: true,
            )"#
        )
        .expect("write plan");

        let plan = load_plan(file.path()).expect("load plan");
        assert_eq!(plan.endpoint, "https://wiki.example/api.php");
        assert_eq!(plan.titles, vec!["One", "Two"]);
        assert_eq!(plan.add, vec!["Ships"]);
        assert_eq!(plan.remove, vec!["Boats"]);
        assert_eq!(plan.skip, vec!["Two"]);
        assert!(plan.retry_on_rate_limit);
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"(
                endpoint: "https://wiki.example/api.php",
                titles: ["One"],
            )"#
        )
        .expect("write plan");

        let plan = load_plan(file.path()).expect("load plan");
        assert!(plan.add.is_empty());
        assert!(plan.remove.is_empty());
        assert!(plan.skip.is_empty());
        assert!(!plan.retry_on_rate_limit);
    }

    #[test]
    fn unreadable_plan_reports_io_error() {
        let err = load_plan(std::path::Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, PlanError::Io(_)));
    }
}
