//! Data-driven API test execution.
//!
//! A [`TestSuite`] holds test cases, the request steps they chain together,
//! and the assertion groups checked against each response. The
//! [`TestRunner`] executes cases with `{{variable}}` templating and
//! pluggable assertion validators. Values extracted from a response are
//! visible to that step's assertions only.

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod runner;
pub mod storage;
pub mod suite;
pub mod testing;

pub use config::RunnerConfig;
pub use environment::VariableScope;
pub use error::{Result, RunnerError};
pub use runner::{CaseReport, CaseStatus, RunReport, TestRunner};
pub use suite::TestSuite;
pub use testing::{Validator, ValidatorRegistry};
