use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;

use crate::config::DatabaseConfig;
use crate::executor::path;

use super::{AssertionContext, Check, Validator};

/// JSON path query over the response body.
pub struct JsonPathValidator {
    kind: &'static str,
}

impl JsonPathValidator {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl Validator for JsonPathValidator {
    fn kind(&self) -> &str {
        self.kind
    }

    fn check(&self, input: &str, ctx: &AssertionContext<'_>) -> Result<Check, String> {
        let document = ctx
            .document
            .ok_or_else(|| "Response body is not JSON".to_string())?;
        Ok(Check::Actual(path::query(document, input)))
    }
}

/// Runs the input as a SQL query and reports the first column of the first
/// row. Opens a fresh connection per assertion.
pub struct DatabaseValidator {
    config: DatabaseConfig,
}

impl DatabaseValidator {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn open(&self) -> Result<Connection, String> {
        let url = self
            .config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| "Database URL is not configured".to_string())?;
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| format!("Failed to open database `{path}`: {e}"))
    }
}

impl Validator for DatabaseValidator {
    fn kind(&self) -> &str {
        "database"
    }

    fn check(&self, input: &str, _ctx: &AssertionContext<'_>) -> Result<Check, String> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(input)
            .map_err(|e| format!("Failed to prepare query: {e}"))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| format!("Failed to execute query: {e}"))?;

        let actual = match rows.next().map_err(|e| format!("Failed to read row: {e}"))? {
            Some(row) => {
                let value = row
                    .get_ref(0)
                    .map_err(|e| format!("Failed to read first column: {e}"))?;
                render_sql(value)
            }
            None => None,
        };
        Ok(Check::Actual(actual))
    }
}

fn render_sql(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Validates the response body against the JSON Schema given as input.
pub struct JsonSchemaValidator;

impl Validator for JsonSchemaValidator {
    fn kind(&self) -> &str {
        "jsonSchema"
    }

    fn check(&self, input: &str, ctx: &AssertionContext<'_>) -> Result<Check, String> {
        let schema: Value =
            serde_json::from_str(input).map_err(|e| format!("Invalid JSON schema: {e}"))?;
        let validator = jsonschema::options()
            .build(&schema)
            .map_err(|e| format!("Failed to compile JSON schema: {e}"))?;
        let document = ctx
            .document
            .ok_or_else(|| "Response body is not JSON".to_string())?;

        let errors: Vec<String> = validator
            .iter_errors(document)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(Check::Verdict {
                passed: true,
                actual: "valid".to_string(),
            })
        } else {
            Ok(Check::Verdict {
                passed: false,
                actual: errors.join("; "),
            })
        }
    }
}

/// Log-search validation has no backend yet.
pub struct KibanaValidator;

impl Validator for KibanaValidator {
    fn kind(&self) -> &str {
        "kibana"
    }

    fn check(&self, _input: &str, _ctx: &AssertionContext<'_>) -> Result<Check, String> {
        tracing::warn!("Kibana assertion validation not implemented");
        Err("Kibana validation is not implemented".to_string())
    }
}
