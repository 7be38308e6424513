use serde::Serialize;

use crate::executor::Extracted;
use crate::suite::{TestCase, TestStep};
use crate::testing::AssertionOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

/// Phases a step moves through. A failure is tagged with the phase it
/// happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepState {
    Pending,
    Sent,
    StatusChecked,
    AssertionsChecked,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub id: String,
    pub method: String,
    pub url: Option<String>,
    pub expected_status: u16,
    pub status: Option<u16>,
    pub duration_ms: Option<u64>,
    pub state: StepState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<StepState>,
    pub extracted: Vec<Extracted>,
    pub assertions: Vec<AssertionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    pub fn pending(step: &TestStep) -> Self {
        Self {
            id: step.id.clone(),
            method: step.method.trim().to_ascii_uppercase(),
            url: None,
            expected_status: step.expected_status,
            status: None,
            duration_ms: None,
            state: StepState::Pending,
            failed_at: None,
            extracted: Vec::new(),
            assertions: Vec::new(),
            response: None,
            error: None,
        }
    }

    /// Report for a step id the suite does not define.
    pub fn missing(step_id: &str, error: String) -> Self {
        Self {
            id: step_id.to_string(),
            method: String::new(),
            url: None,
            expected_status: 0,
            status: None,
            duration_ms: None,
            state: StepState::Failed,
            failed_at: Some(StepState::Pending),
            extracted: Vec::new(),
            assertions: Vec::new(),
            response: None,
            error: Some(error),
        }
    }

    pub fn passed(&self) -> bool {
        self.state == StepState::Done
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub id: String,
    pub name: String,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerequisite: Option<Box<CaseReport>>,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseReport {
    pub fn skipped(case: &TestCase) -> Self {
        Self {
            id: case.id.clone(),
            name: case.name.clone(),
            status: CaseStatus::Skipped,
            prerequisite: None,
            steps: Vec::new(),
            duration_ms: 0,
            error: None,
        }
    }

    /// Every assertion that failed in this case, prerequisites excluded.
    pub fn failed_assertions(&self) -> impl Iterator<Item = (&str, &AssertionOutcome)> {
        self.steps.iter().flat_map(|step| {
            step.assertions
                .iter()
                .filter(|a| !a.passed)
                .map(move |a| (step.id.as_str(), a))
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub cases: Vec<CaseReport>,
    pub summary: Summary,
}

impl RunReport {
    pub fn new(cases: Vec<CaseReport>, duration_ms: u64) -> Self {
        let mut summary = Summary {
            total: cases.len(),
            duration_ms,
            ..Summary::default()
        };
        for case in &cases {
            match case.status {
                CaseStatus::Passed => summary.passed += 1,
                CaseStatus::Failed => summary.failed += 1,
                CaseStatus::Skipped => summary.skipped += 1,
            }
        }
        Self { cases, summary }
    }

    pub fn success(&self) -> bool {
        self.summary.failed == 0
    }

    pub fn case(&self, id: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.id == id)
    }
}
