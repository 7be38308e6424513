//! JSON path queries over response bodies.
//!
//! Full JSONPath (`$.data.items[0].id`) is accepted, as are bare dotted
//! paths (`data.items[0].id`) which are rooted at `$` first.

use serde_json::Value;

pub fn normalize(path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let normalized = if path.starts_with('$') {
        path.to_string()
    } else if path.starts_with('[') {
        format!("${path}")
    } else {
        format!("$.{path}")
    };
    Some(normalized)
}

/// First match of `path` in `document`. `None` for invalid paths, no match
/// or `null`.
pub fn select<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let path = normalize(path)?;
    match jsonpath_lib::select(document, &path) {
        Ok(matches) => matches.into_iter().find(|value| !value.is_null()),
        Err(e) => {
            tracing::warn!(path = %path, error = ?e, "Invalid JSON path");
            None
        }
    }
}

/// Like [`select`], rendered as text: strings verbatim, everything else as
/// its JSON form.
pub fn query(document: &Value, path: &str) -> Option<String> {
    select(document, path).map(stringify)
}

pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
