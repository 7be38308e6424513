//! # Test Suite Model
//!
//! In-memory form of a declarative test suite: cases, steps, assertion
//! groups, header groups, body templates and per-case seed data. A suite is
//! assembled once by ingestion and only borrowed by the runner afterwards.
//!
//! Documents arrive as flat record tables (one array per sheet) and are
//! grouped into keyed maps on deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type CaseId = String;
pub type StepId = String;

const DEFAULT_EXPECTED_STATUS: u16 = 200;

fn default_expected_status() -> u16 {
    DEFAULT_EXPECTED_STATUS
}

fn default_execute() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: CaseId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_execute")]
    pub execute: bool,
    #[serde(default)]
    pub prerequisite: Option<CaseId>,
    #[serde(default)]
    pub steps: Vec<StepId>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, steps: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            execute: true,
            prerequisite: None,
            steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The prerequisite id, ignoring blank cells.
    pub fn prerequisite_id(&self) -> Option<&str> {
        self.prerequisite
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub id: StepId,
    #[serde(default)]
    pub api_name: String,
    pub method: String,
    pub endpoint: String,
    #[serde(default)]
    pub headers: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    #[serde(default)]
    pub assertions: Option<String>,
    #[serde(default)]
    pub save_response: bool,
}

impl TestStep {
    pub fn new(id: impl Into<String>, method: &str, endpoint: &str) -> Self {
        Self {
            id: id.into(),
            api_name: String::new(),
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            headers: None,
            body: None,
            extract: None,
            expected_status: DEFAULT_EXPECTED_STATUS,
            assertions: None,
            save_response: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected: String,
}

impl Assertion {
    pub fn new(id: &str, kind: &str, input: &str, expected: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            input: input.to_string(),
            expected: expected.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub id: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    pub case_id: CaseId,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BodyRecord {
    id: String,
    template: String,
}

/// Flat record tables as emitted by an ingestion front-end.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SuiteRecords {
    test_cases: Vec<TestCase>,
    test_steps: Vec<TestStep>,
    assertions: Vec<Assertion>,
    headers: Vec<Header>,
    bodies: Vec<BodyRecord>,
    test_data: Vec<TestData>,
}

/// Aggregate root of a test suite.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "SuiteRecords")]
pub struct TestSuite {
    cases: Vec<TestCase>,
    steps: HashMap<StepId, TestStep>,
    assertions: HashMap<String, Vec<Assertion>>,
    headers: HashMap<String, Vec<Header>>,
    bodies: HashMap<String, String>,
    test_data: HashMap<CaseId, Vec<TestData>>,
}

impl From<SuiteRecords> for TestSuite {
    fn from(records: SuiteRecords) -> Self {
        let mut suite = TestSuite::default();
        for case in records.test_cases {
            suite.add_case(case);
        }
        for step in records.test_steps {
            suite.add_step(step);
        }
        for assertion in records.assertions {
            suite.add_assertion(assertion);
        }
        for header in records.headers {
            suite.add_header(header);
        }
        for body in records.bodies {
            suite.add_body(body.id, body.template);
        }
        for data in records.test_data {
            suite.add_test_data(data);
        }
        suite
    }
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a case, replacing an earlier case with the same id in place.
    pub fn add_case(&mut self, case: TestCase) -> &mut Self {
        match self.cases.iter_mut().find(|c| c.id == case.id) {
            Some(existing) => *existing = case,
            None => self.cases.push(case),
        }
        self
    }

    pub fn add_step(&mut self, step: TestStep) -> &mut Self {
        self.steps.insert(step.id.clone(), step);
        self
    }

    pub fn add_assertion(&mut self, assertion: Assertion) -> &mut Self {
        self.assertions
            .entry(assertion.id.clone())
            .or_default()
            .push(assertion);
        self
    }

    pub fn add_header(&mut self, header: Header) -> &mut Self {
        self.headers.entry(header.id.clone()).or_default().push(header);
        self
    }

    pub fn add_body(&mut self, id: impl Into<String>, template: impl Into<String>) -> &mut Self {
        self.bodies.insert(id.into(), template.into());
        self
    }

    pub fn add_test_data(&mut self, data: TestData) -> &mut Self {
        self.test_data
            .entry(data.case_id.clone())
            .or_default()
            .push(data);
        self
    }

    /// Test cases in stored order.
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn case(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn step(&self, id: &str) -> Option<&TestStep> {
        self.steps.get(id)
    }

    pub fn assertions(&self) -> &HashMap<String, Vec<Assertion>> {
        &self.assertions
    }

    pub fn header_group(&self, id: &str) -> &[Header] {
        self.headers.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn body(&self, id: &str) -> Option<&str> {
        self.bodies.get(id).map(String::as_str)
    }

    pub fn test_data(&self, case_id: &str) -> &[TestData] {
        self.test_data
            .get(case_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
