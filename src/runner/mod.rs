//! # Suite Runner
//!
//! Drives a suite: cases run one at a time in stored order, each in its own
//! [`ExecutionContext`]. A case first runs its prerequisite chain, then its
//! steps in declared order. A step is sent, its status code checked against
//! the expected one, then its assertion group evaluated. The first failing
//! step ends the case; a failed prerequisite ends the dependent case. Other
//! cases keep running.

pub mod graph;
pub mod report;

use std::ops::{Deref, DerefMut};
use std::time::Instant;

use crate::config::RunnerConfig;
use crate::environment::{UnresolvedPolicy, Variable, VariableScope};
use crate::error::{Result, RunnerError};
use crate::executor::{RequestExecutor, reference};
use crate::http::{HttpClient, Transport};
use crate::suite::{TestCase, TestStep, TestSuite};
use crate::testing::{AssertionEngine, ValidatorRegistry};

pub use report::{CaseReport, CaseStatus, RunReport, StepReport, StepState, Summary};

/// Per-case state threaded through request execution and assertions.
#[derive(Debug)]
pub struct ExecutionContext {
    pub case_id: String,
    pub scope: VariableScope,
}

impl ExecutionContext {
    pub fn new(case_id: &str, globals: &[Variable], policy: UnresolvedPolicy) -> Self {
        Self {
            case_id: case_id.to_string(),
            scope: VariableScope::with_globals(globals, policy),
        }
    }
}

/// Clears the step layer when dropped, whatever the step's outcome.
struct StepScope<'a>(&'a mut VariableScope);

impl Deref for StepScope<'_> {
    type Target = VariableScope;

    fn deref(&self) -> &VariableScope {
        self.0
    }
}

impl DerefMut for StepScope<'_> {
    fn deref_mut(&mut self) -> &mut VariableScope {
        self.0
    }
}

impl Drop for StepScope<'_> {
    fn drop(&mut self) {
        self.0.clear_step();
    }
}

pub struct TestRunner {
    executor: RequestExecutor,
    assertions: AssertionEngine,
    globals: Vec<Variable>,
    policy: UnresolvedPolicy,
}

impl TestRunner {
    /// Runner sending real HTTP requests.
    pub fn new(config: &RunnerConfig) -> Result<Self> {
        let client = HttpClient::new(config.timeout())?;
        Ok(Self::with_transport(config, Box::new(client)))
    }

    pub fn with_transport(config: &RunnerConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            executor: RequestExecutor::new(config.base_url.clone(), transport),
            assertions: AssertionEngine::new(ValidatorRegistry::with_defaults(
                config.database.clone(),
            )),
            globals: config.globals.clone(),
            policy: config.unresolved,
        }
    }

    pub fn assertions_mut(&mut self) -> &mut AssertionEngine {
        &mut self.assertions
    }

    /// Run every case in stored order. Cases with `execute` unset are
    /// skipped. Prerequisite cycles abort before anything is sent.
    pub fn run_suite(&self, suite: &TestSuite) -> Result<RunReport> {
        graph::check_prerequisites(suite)?;
        tracing::info!(cases = suite.cases().len(), "Starting test suite execution");

        let started = Instant::now();
        let mut reports = Vec::with_capacity(suite.cases().len());
        for case in suite.cases() {
            if !case.execute {
                tracing::info!(case = %case.id, "Skipping test case marked for non-execution");
                reports.push(CaseReport::skipped(case));
                continue;
            }
            reports.push(self.execute_case(case, suite));
        }

        let report = RunReport::new(reports, elapsed_ms(started));
        log_summary(&report);
        Ok(report)
    }

    /// Run the named cases in the given order, regardless of their
    /// `execute` flag.
    pub fn run_cases(&self, suite: &TestSuite, ids: &[String]) -> Result<RunReport> {
        let cases = ids
            .iter()
            .map(|id| {
                suite
                    .case(id)
                    .ok_or_else(|| RunnerError::CaseNotFound(id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        for case in &cases {
            graph::prerequisite_chain(suite, &case.id)?;
        }

        let started = Instant::now();
        let reports = cases
            .into_iter()
            .map(|case| self.execute_case(case, suite))
            .collect();
        let report = RunReport::new(reports, elapsed_ms(started));
        log_summary(&report);
        Ok(report)
    }

    /// Run one case and its prerequisites.
    pub fn run_case(&self, case: &TestCase, suite: &TestSuite) -> Result<CaseReport> {
        graph::prerequisite_chain(suite, &case.id)?;
        Ok(self.execute_case(case, suite))
    }

    /// Callers must have ruled out prerequisite cycles.
    fn execute_case(&self, case: &TestCase, suite: &TestSuite) -> CaseReport {
        tracing::info!(case = %case.id, "Executing test case");
        let started = Instant::now();

        let mut ctx = ExecutionContext::new(&case.id, &self.globals, self.policy);
        ctx.scope.init_case(&case.id, suite.test_data(&case.id));

        let mut prerequisite = None;
        let mut steps = Vec::new();
        let error = self
            .drive_case(case, suite, &mut ctx, &mut prerequisite, &mut steps)
            .err();

        ctx.scope.clear_case();

        let status = match &error {
            None => CaseStatus::Passed,
            Some(e) => {
                tracing::error!(case = %case.id, error = %e, "Test case failed");
                CaseStatus::Failed
            }
        };
        if status == CaseStatus::Passed {
            tracing::info!(case = %case.id, "Test case passed");
        }

        CaseReport {
            id: case.id.clone(),
            name: case.name.clone(),
            status,
            prerequisite,
            steps,
            duration_ms: elapsed_ms(started),
            error: error.map(|e| e.to_string()),
        }
    }

    fn drive_case(
        &self,
        case: &TestCase,
        suite: &TestSuite,
        ctx: &mut ExecutionContext,
        prerequisite: &mut Option<Box<CaseReport>>,
        steps: &mut Vec<StepReport>,
    ) -> Result<()> {
        if let Some(prerequisite_id) = case.prerequisite_id() {
            match suite.case(prerequisite_id) {
                Some(required) => {
                    tracing::info!(case = %case.id, prerequisite = %required.id, "Running prerequisite");
                    let report = self.execute_case(required, suite);
                    let failed = report.status == CaseStatus::Failed;
                    *prerequisite = Some(Box::new(report));
                    if failed {
                        return Err(RunnerError::PrerequisiteFailed {
                            case: case.id.clone(),
                            prerequisite: required.id.clone(),
                        });
                    }
                }
                None => tracing::warn!(
                    case = %case.id,
                    prerequisite = prerequisite_id,
                    "Prerequisite not found, continuing without it"
                ),
            }
        }

        for step_id in &case.steps {
            let Some(step) = suite.step(step_id) else {
                let err = RunnerError::StepNotFound(step_id.clone());
                steps.push(StepReport::missing(step_id, err.to_string()));
                return Err(err);
            };

            let (report, outcome) = self.run_step(step, suite, ctx);
            steps.push(report);
            outcome?;
        }

        Ok(())
    }

    fn run_step(
        &self,
        step: &TestStep,
        suite: &TestSuite,
        ctx: &mut ExecutionContext,
    ) -> (StepReport, Result<()>) {
        tracing::info!(case = %ctx.case_id, step = %step.id, "Executing test step");
        let mut report = StepReport::pending(step);

        let outcome = {
            let mut scope = StepScope(&mut ctx.scope);
            self.drive_step(step, suite, &mut scope, &mut report)
        };

        if let Err(e) = &outcome {
            tracing::error!(step = %step.id, error = %e, "Test step failed");
            report.failed_at = Some(failed_phase(e));
            report.state = StepState::Failed;
            report.error = Some(e.to_string());
        }

        (report, outcome)
    }

    fn drive_step(
        &self,
        step: &TestStep,
        suite: &TestSuite,
        scope: &mut VariableScope,
        report: &mut StepReport,
    ) -> Result<()> {
        let exchange = self.executor.execute(step, suite, scope)?;
        let response = &exchange.response;
        report.state = StepState::Sent;
        report.url = Some(exchange.request.url.clone());
        report.status = Some(response.status);
        report.duration_ms = Some(u64::try_from(response.duration_ms).unwrap_or(u64::MAX));
        report.extracted = exchange.extracted.clone();

        if response.status != step.expected_status {
            tracing::error!(
                step = %step.id,
                expected = step.expected_status,
                actual = response.status,
                "Status code mismatch"
            );
            return Err(RunnerError::StatusMismatch {
                expected: step.expected_status,
                actual: response.status,
            });
        }
        report.state = StepState::StatusChecked;

        if let Some(group) = reference(&step.assertions) {
            let outcome =
                self.assertions
                    .validate_group(response, group, suite.assertions(), scope);
            report.assertions = outcome.outcomes.clone();
            if !outcome.passed() {
                return Err(RunnerError::AssertionsFailed {
                    group: group.to_string(),
                    failed: outcome.failures().count(),
                    total: outcome.outcomes.len(),
                });
            }
        }
        report.state = StepState::AssertionsChecked;

        if step.save_response {
            tracing::info!(step = %step.id, body = %response.body, "Saved response");
            report.response = Some(response.body.clone());
        }
        report.state = StepState::Done;
        Ok(())
    }
}

/// Phase a step error belongs to. Requests rejected while being built never
/// leave `Pending`.
fn failed_phase(err: &RunnerError) -> StepState {
    match err {
        RunnerError::InvalidMethod(_) | RunnerError::InvalidRequest(_) => StepState::Pending,
        RunnerError::StatusMismatch { .. } => StepState::StatusChecked,
        RunnerError::AssertionsFailed { .. } => StepState::AssertionsChecked,
        _ => StepState::Sent,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn log_summary(report: &RunReport) {
    let summary = &report.summary;
    tracing::info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        duration_ms = summary.duration_ms,
        "Test suite execution finished"
    );
}
