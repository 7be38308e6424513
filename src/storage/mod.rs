use std::fs;
use std::path::Path;

use crate::error::{Result, RunnerError};
use crate::runner::RunReport;
use crate::suite::TestSuite;

/// Read a suite document: one JSON array per record table.
pub fn load_suite(path: &Path) -> Result<TestSuite> {
    let raw = fs::read_to_string(path).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let suite: TestSuite = serde_json::from_str(&raw).map_err(|source| RunnerError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), cases = suite.cases().len(), "Loaded test suite");
    Ok(suite)
}

pub fn save_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RunnerError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = serde_json::to_string_pretty(report)
        .map_err(|e| RunnerError::Config(format!("Failed to serialize report: {e}")))?;
    fs::write(path, raw).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CaseReport, CaseStatus};
    use crate::suite::TestCase;

    #[test]
    fn loads_suite_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.json");
        fs::write(
            &path,
            r#"{
                "testCases": [{"id": "TC_001", "name": "Get user", "steps": ["S1"]}],
                "testSteps": [{"id": "S1", "method": "GET", "endpoint": "/users/{{userId}}"}],
                "testData": [{"caseId": "TC_001", "name": "userId", "value": "7"}]
            }"#,
        )
        .unwrap();

        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.case("TC_001").unwrap().name, "Get user");
        assert_eq!(suite.step("S1").unwrap().endpoint, "/users/{{userId}}");
    }

    #[test]
    fn missing_and_malformed_suites_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_suite(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, RunnerError::Io { .. }));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"testSteps": [{"id": "S1"}]}"#).unwrap();
        let malformed = load_suite(&path).unwrap_err();
        assert!(matches!(malformed, RunnerError::Parse { .. }));
    }

    #[test]
    fn report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let report = RunReport::new(vec![CaseReport::skipped(&TestCase::new("TC", &[]))], 3);

        save_report(&path, &report).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"]["skipped"], 1);
        assert_eq!(written["cases"][0]["status"], "skipped");
        assert_eq!(report.cases[0].status, CaseStatus::Skipped);
    }
}
