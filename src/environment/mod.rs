//! # Variables & Templating
//!
//! Layered variable scope used while a suite runs. Three layers are
//! consulted in order of precedence:
//!
//! - step: values extracted from the current step's response
//! - case: seed data of the running test case
//! - global: values configured for the whole run
//!
//! Templates use `{{name}}` for variables and `{{$func(args)}}` for the
//! built-in dynamic values in [`functions`].

pub mod functions;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::suite::TestData;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder pattern is valid"));
static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\$([A-Za-z_][A-Za-z0-9_]*)\((.*)\)\s*$").expect("function pattern is valid")
});

/// What `substitute` does with a placeholder that resolves to nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Leave `{{name}}` in the output.
    #[default]
    Keep,
    /// Replace it with the empty string.
    Blank,
}

/// A single configured variable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    global: HashMap<String, String>,
    case: HashMap<String, String>,
    step: HashMap<String, String>,
    policy: UnresolvedPolicy,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope whose global layer holds every enabled, non-empty variable.
    pub fn with_globals(globals: &[Variable], policy: UnresolvedPolicy) -> Self {
        let mut scope = Self {
            policy,
            ..Self::default()
        };
        for var in globals {
            if var.enabled && !var.key.is_empty() {
                scope.set_global_variable(&var.key, &var.value);
            }
        }
        scope
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.global.insert(name.into(), value.into());
    }

    pub fn set_case_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.case.insert(name.into(), value.into());
    }

    /// Extraction only ever writes here; case and global stay untouched.
    pub fn set_step_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.step.insert(name.into(), value.into());
    }

    /// Record an extraction that produced nothing. Lookups fall through to
    /// the case and global layers.
    pub fn unset_step_variable(&mut self, name: &str) {
        self.step.remove(name);
    }

    /// Reset case and step layers, then seed the case layer from records
    /// belonging to `case_id`.
    pub fn init_case(&mut self, case_id: &str, seed: &[TestData]) {
        self.clear_case();
        for data in seed.iter().filter(|d| d.case_id == case_id) {
            self.case.insert(data.name.clone(), data.value.clone());
        }
        tracing::debug!(case = case_id, variables = self.case.len(), "Initialized case variables");
    }

    pub fn clear_step(&mut self) {
        self.step.clear();
    }

    /// Clears the step layer as well.
    pub fn clear_case(&mut self) {
        self.case.clear();
        self.step.clear();
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        let value = self
            .step
            .get(name)
            .or_else(|| self.case.get(name))
            .or_else(|| self.global.get(name));
        if value.is_none() {
            tracing::warn!(variable = name, "Variable not found in any scope");
        }
        value.map(String::as_str)
    }

    /// Expand every `{{...}}` placeholder in a single left-to-right pass.
    /// Inserted values are never re-expanded.
    pub fn substitute(&self, template: &str) -> String {
        if !template.contains("{{") {
            return template.to_string();
        }

        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                let expression = &caps[1];
                match self.evaluate(expression) {
                    Some(value) => value,
                    None => match self.policy {
                        UnresolvedPolicy::Keep => caps[0].to_string(),
                        UnresolvedPolicy::Blank => String::new(),
                    },
                }
            })
            .into_owned()
    }

    fn evaluate(&self, expression: &str) -> Option<String> {
        if let Some(call) = FUNCTION_CALL.captures(expression) {
            return functions::call(&call[1], &call[2]);
        }
        self.resolve(expression.trim()).map(str::to_string)
    }
}
