//! # Command Line
//!
//! `apiflow run suite.json` runs a suite for CI pipelines. The process exits
//! with [`EXIT_PASSED`] when every executed case passed, [`EXIT_FAILED`]
//! when any case failed, and [`EXIT_ERROR`] when the run could not start.

use std::fmt::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::runner::{CaseReport, CaseStatus, RunReport, StepReport};

pub const EXIT_PASSED: u8 = 0;
pub const EXIT_FAILED: u8 = 1;
pub const EXIT_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "apiflow", version, about = "Run data-driven API test suites.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the cases of a suite file.
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Suite document (JSON).
    #[arg(value_name = "SUITE")]
    pub suite: PathBuf,

    /// Runner configuration file. Defaults to `apiflow.json` when present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run only these cases, in the given order. Repeatable.
    #[arg(long = "case", value_name = "ID")]
    pub cases: Vec<String>,

    /// Override the base URL from config and environment.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the JSON report to this file.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Output format for the report printed to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Human-readable report, one line per case and step.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    for case in &report.cases {
        render_case(&mut out, case, 0);
    }

    let s = &report.summary;
    let _ = writeln!(
        out,
        "\n{} cases: {} passed, {} failed, {} skipped ({} ms)",
        s.total, s.passed, s.failed, s.skipped, s.duration_ms
    );
    out
}

fn render_case(out: &mut String, case: &CaseReport, depth: usize) {
    let pad = "  ".repeat(depth);
    let label = match case.status {
        CaseStatus::Passed => "PASS",
        CaseStatus::Failed => "FAIL",
        CaseStatus::Skipped => "SKIP",
    };
    let _ = writeln!(out, "{pad}{label} {} {}", case.id, case.name);

    if let Some(prerequisite) = &case.prerequisite {
        let _ = writeln!(out, "{pad}  prerequisite:");
        render_case(out, prerequisite, depth + 2);
    }
    for step in &case.steps {
        render_step(out, step, depth + 1);
    }
    if let Some(error) = &case.error {
        let _ = writeln!(out, "{pad}  error: {error}");
    }
}

fn render_step(out: &mut String, step: &StepReport, depth: usize) {
    let pad = "  ".repeat(depth);
    let mark = if step.passed() { "ok" } else { "x " };
    let status = step
        .status
        .map_or_else(|| "---".to_string(), |s| s.to_string());
    let url = step.url.as_deref().unwrap_or("-");
    let _ = writeln!(
        out,
        "{pad}{mark} {} {} {url} -> {status} (expected {})",
        step.id, step.method, step.expected_status
    );

    for outcome in step.assertions.iter().filter(|a| !a.passed) {
        let actual = outcome.actual.as_deref().unwrap_or("<none>");
        let _ = writeln!(
            out,
            "{pad}   assertion {} [{}] {}: expected `{}`, actual `{actual}`",
            outcome.id, outcome.kind, outcome.input, outcome.expected
        );
        if let Some(error) = &outcome.error {
            let _ = writeln!(out, "{pad}     {error}");
        }
    }
}
