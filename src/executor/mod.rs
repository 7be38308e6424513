//! # Request Execution
//!
//! Turns a declarative test step into an HTTP call: headers, body and
//! endpoint templates are expanded against the variable scope, the request
//! is sent through a [`Transport`], and values named by the step's
//! extraction rules are read back out of the response into the step layer.

pub mod path;

use serde::Serialize;

use crate::environment::VariableScope;
use crate::error::Result;
use crate::http::{HttpMethod, HttpResponse, RequestInput, Transport};
use crate::suite::{TestStep, TestSuite};

const CONTENT_TYPE: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// A variable written (or cleared) by extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extracted {
    pub name: String,
    pub path: String,
    pub value: Option<String>,
}

/// The resolved request together with what came back.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: RequestInput,
    pub response: HttpResponse,
    pub extracted: Vec<Extracted>,
}

pub struct RequestExecutor {
    base_url: String,
    transport: Box<dyn Transport>,
}

impl RequestExecutor {
    pub fn new(base_url: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// Build the outbound request for `step` without sending it.
    pub fn prepare(
        &self,
        step: &TestStep,
        suite: &TestSuite,
        scope: &VariableScope,
    ) -> Result<RequestInput> {
        let method: HttpMethod = step.method.parse()?;
        let endpoint = scope.substitute(&step.endpoint);
        let mut request = RequestInput::new(method, join_url(&self.base_url, &endpoint));

        if let Some(group) = reference(&step.headers) {
            for header in suite.header_group(group) {
                request
                    .headers
                    .push((header.key.clone(), scope.substitute(&header.value)));
            }
        }

        if let Some(body_id) = reference(&step.body) {
            match suite.body(body_id) {
                Some(template) => {
                    request.body = Some(scope.substitute(template));
                    if !request.has_header(CONTENT_TYPE) {
                        request
                            .headers
                            .push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
                    }
                }
                None => tracing::debug!(step = %step.id, body = body_id, "Body not found, sending none"),
            }
        }

        Ok(request)
    }

    /// Send the step's request and apply its extraction rules.
    pub fn execute(
        &self,
        step: &TestStep,
        suite: &TestSuite,
        scope: &mut VariableScope,
    ) -> Result<Exchange> {
        let request = self.prepare(step, suite, scope)?;

        tracing::info!(step = %step.id, method = %request.method, url = %request.url, "Sending request");
        let response = self.transport.send(&request)?;
        tracing::debug!(
            step = %step.id,
            status = response.status,
            duration_ms = response.duration_ms as u64,
            "Received response"
        );

        let extracted = match reference(&step.extract) {
            Some(rules) => extract_variables(&response, rules, scope),
            None => Vec::new(),
        };

        Ok(Exchange {
            request,
            response,
            extracted,
        })
    }
}

/// `name=path` pairs from a comma-separated list. Entries without `=` or
/// with an empty side are skipped.
pub fn parse_extraction(rules: &str) -> Vec<(String, String)> {
    rules.split(',')
        .filter_map(|entry| {
            let (name, path) = entry.trim().split_once('=')?;
            let (name, path) = (name.trim(), path.trim());
            if name.is_empty() || path.is_empty() {
                return None;
            }
            Some((name.to_string(), path.to_string()))
        })
        .collect()
}

fn extract_variables(
    response: &HttpResponse,
    rules: &str,
    scope: &mut VariableScope,
) -> Vec<Extracted> {
    let document = response.json();
    if document.is_none() {
        tracing::warn!("Response body is not JSON, extracted variables will be empty");
    }

    parse_extraction(rules)
        .into_iter()
        .map(|(name, path)| {
            let value = document.as_ref().and_then(|doc| path::query(doc, &path));
            match &value {
                Some(value) => scope.set_step_variable(&name, value),
                None => scope.unset_step_variable(&name),
            }
            tracing::debug!(variable = %name, path = %path, value = ?value, "Extracted variable");
            Extracted { name, path, value }
        })
        .collect()
}

fn join_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let path = endpoint.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// A reference cell, ignoring blanks.
pub(crate) fn reference(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::suite::Header;

    /// Replays one canned response and remembers what it was sent.
    struct Canned {
        response: HttpResponse,
        sent: Rc<RefCell<Vec<RequestInput>>>,
    }

    impl Transport for Canned {
        fn send(&self, request: &RequestInput) -> Result<HttpResponse> {
            self.sent.borrow_mut().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn executor(body: &str) -> (RequestExecutor, Rc<RefCell<Vec<RequestInput>>>) {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let transport = Canned {
            response: HttpResponse::new(200, body),
            sent: Rc::clone(&sent),
        };
        (
            RequestExecutor::new("http://api.test/", Box::new(transport)),
            sent,
        )
    }

    #[test]
    fn join_handles_slashes_and_absolute_urls() {
        assert_eq!(join_url("http://a/", "/users"), "http://a/users");
        assert_eq!(join_url("http://a", "users"), "http://a/users");
        assert_eq!(join_url("http://a/", ""), "http://a");
        assert_eq!(join_url("http://a", "https://b/x"), "https://b/x");
    }

    #[test]
    fn parse_extraction_skips_malformed_entries() {
        let pairs = parse_extraction("userId=id, broken, token = data.token ,=x, y=");
        assert_eq!(
            pairs,
            vec![
                ("userId".to_string(), "id".to_string()),
                ("token".to_string(), "data.token".to_string()),
            ]
        );
    }

    #[test]
    fn templates_are_expanded_into_the_request() {
        let (executor, sent) = executor("{}");
        let mut suite = TestSuite::new();
        suite
            .add_header(Header {
                id: "H1".into(),
                key: "Authorization".into(),
                value: "Bearer {{token}}".into(),
            })
            .add_body("B1", r#"{"name":"{{name}}"}"#);
        let mut step = TestStep::new("S1", "post", "/users/{{userId}}");
        step.headers = Some("H1".into());
        step.body = Some("B1".into());

        let mut scope = VariableScope::new();
        scope.set_global_variable("token", "t0k");
        scope.set_case_variable("name", "ada");
        scope.set_case_variable("userId", "7");

        executor.execute(&step, &suite, &mut scope).unwrap();

        let sent = sent.borrow();
        let request = &sent[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "http://api.test/users/7");
        assert_eq!(request.body.as_deref(), Some(r#"{"name":"ada"}"#));
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Bearer t0k".to_string())));
        assert!(request.has_header("content-type"));
    }

    #[test]
    fn missing_body_sends_nothing() {
        let (executor, sent) = executor("{}");
        let mut step = TestStep::new("S1", "GET", "/users");
        step.body = Some("B404".into());

        executor
            .execute(&step, &TestSuite::new(), &mut VariableScope::new())
            .unwrap();

        let sent = sent.borrow();
        let request = &sent[0];
        assert_eq!(request.body, None);
        assert!(!request.has_header("Content-Type"));
    }

    #[test]
    fn extraction_writes_the_step_layer() {
        let (executor, _) = executor(r#"{"id":"42","data":{"token":"abc"}}"#);
        let mut step = TestStep::new("S1", "GET", "/users");
        step.extract = Some("userId=id, token=$.data.token, gone=nope".into());

        let mut scope = VariableScope::new();
        scope.set_case_variable("gone", "from-case");
        let exchange = executor
            .execute(&step, &TestSuite::new(), &mut scope)
            .unwrap();

        assert_eq!(scope.resolve("userId"), Some("42"));
        assert_eq!(scope.resolve("token"), Some("abc"));
        // Missing path leaves nothing in the step layer.
        assert_eq!(scope.resolve("gone"), Some("from-case"));
        assert_eq!(exchange.extracted.len(), 3);
        assert_eq!(exchange.extracted[2].value, None);

        scope.clear_step();
        assert_eq!(scope.resolve("userId"), None);
    }

    #[test]
    fn unknown_method_fails_before_sending() {
        let (executor, sent) = executor("{}");
        let step = TestStep::new("S1", "FETCH", "/users");

        let result = executor.execute(&step, &TestSuite::new(), &mut VariableScope::new());

        assert!(result.is_err());
        assert!(sent.borrow().is_empty());
    }
}
