//! # Assertions
//!
//! Assertion groups are checked against a step's response through a
//! registry of [`Validator`]s keyed by validation kind. Every assertion in a
//! group is evaluated, even after a failure, so one report shows every
//! mismatch. Results are returned as [`AssertionOutcome`] values.
//!
//! Built-in kinds:
//! - `responseBody`, `responseMetaType`: JSON path over the response body
//! - `database`: first column of the first row of a SQL query
//! - `jsonSchema`: the response body validates against a schema
//! - `kibana`: reserved, always fails

mod validators;

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::DatabaseConfig;
use crate::environment::VariableScope;
use crate::http::HttpResponse;
use crate::suite::Assertion;

pub use validators::{DatabaseValidator, JsonPathValidator, JsonSchemaValidator, KibanaValidator};

const REGEX_PREFIX: &str = "regex:";

/// What a validator observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// A value to compare against the expected value. `None` never matches.
    Actual(Option<String>),
    /// The validator decided on its own.
    Verdict { passed: bool, actual: String },
}

/// Everything a validator may look at.
pub struct AssertionContext<'a> {
    pub response: &'a HttpResponse,
    pub document: Option<&'a Value>,
    pub scope: &'a VariableScope,
}

pub trait Validator {
    /// Validation kind this handles, matched case-insensitively.
    fn kind(&self) -> &str;

    /// Evaluate the (already substituted) validation input. Errors are
    /// reported as failed assertions.
    fn check(&self, input: &str, ctx: &AssertionContext<'_>) -> Result<Check, String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionOutcome {
    pub id: String,
    pub kind: String,
    pub input: String,
    pub expected: String,
    pub actual: Option<String>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    pub group: String,
    pub outcomes: Vec<AssertionOutcome>,
}

impl GroupOutcome {
    /// True when no assertion failed; an empty group passes.
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &AssertionOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Box<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind.
    pub fn with_defaults(database: DatabaseConfig) -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(JsonPathValidator::new("responseBody")))
            .register(Box::new(JsonPathValidator::new("responseMetaType")))
            .register(Box::new(DatabaseValidator::new(database)))
            .register(Box::new(JsonSchemaValidator))
            .register(Box::new(KibanaValidator));
        registry
    }

    /// Add a validator, replacing any existing one for the same kind.
    pub fn register(&mut self, validator: Box<dyn Validator>) -> &mut Self {
        self.validators
            .insert(validator.kind().to_ascii_lowercase(), validator);
        self
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Validator> {
        self.validators
            .get(&kind.trim().to_ascii_lowercase())
            .map(|validator| validator.as_ref())
    }
}

pub struct AssertionEngine {
    registry: ValidatorRegistry,
}

impl AssertionEngine {
    pub fn new(registry: ValidatorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.registry
    }

    pub fn validate_group(
        &self,
        response: &HttpResponse,
        group_id: &str,
        assertions_by_group: &HashMap<String, Vec<Assertion>>,
        scope: &VariableScope,
    ) -> GroupOutcome {
        let assertions = assertions_by_group
            .get(group_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if assertions.is_empty() {
            tracing::warn!(group = group_id, "No assertions found for group");
        }

        let document = response.json();
        let ctx = AssertionContext {
            response,
            document: document.as_ref(),
            scope,
        };

        let outcomes = assertions
            .iter()
            .map(|assertion| self.validate(assertion, &ctx))
            .collect();

        GroupOutcome {
            group: group_id.to_string(),
            outcomes,
        }
    }

    pub fn validate(&self, assertion: &Assertion, ctx: &AssertionContext<'_>) -> AssertionOutcome {
        let input = ctx.scope.substitute(&assertion.input);
        let expected = ctx.scope.substitute(&assertion.expected);

        let result = match self.registry.get(&assertion.kind) {
            Some(validator) => validator.check(&input, ctx),
            None => {
                tracing::warn!(kind = %assertion.kind, "Unknown assertion type");
                Err(format!("Unknown assertion type `{}`", assertion.kind))
            }
        };

        let (passed, actual, error) = match result {
            Ok(Check::Actual(actual)) => match matches_expected(actual.as_deref(), &expected) {
                Ok(passed) => (passed, actual, None),
                Err(e) => (false, actual, Some(e)),
            },
            Ok(Check::Verdict { passed, actual }) => (passed, Some(actual), None),
            Err(e) => (false, None, Some(e)),
        };

        if passed {
            tracing::info!(assertion = %assertion.id, kind = %assertion.kind, "Assertion passed");
        } else {
            tracing::error!(
                assertion = %assertion.id,
                kind = %assertion.kind,
                expected = %expected,
                actual = ?actual,
                error = ?error,
                "Assertion failed"
            );
        }

        AssertionOutcome {
            id: assertion.id.clone(),
            kind: assertion.kind.clone(),
            input,
            expected,
            actual,
            passed,
            error,
        }
    }
}

/// `regex:` expectations match anywhere in the actual value; everything else
/// is compared as text.
pub fn matches_expected(actual: Option<&str>, expected: &str) -> Result<bool, String> {
    let Some(actual) = actual else {
        return Ok(false);
    };
    match expected.strip_prefix(REGEX_PREFIX) {
        Some(pattern) => {
            let regex =
                Regex::new(pattern).map_err(|e| format!("Invalid expected pattern `{pattern}`: {e}"))?;
            Ok(regex.is_match(actual))
        }
        None => Ok(actual == expected),
    }
}
