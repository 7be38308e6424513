use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Result, RunnerError};

use super::request::RequestInput;
use super::response::HttpResponse;

/// Sends a resolved request and waits for the full response.
pub trait Transport {
    fn send(&self, request: &RequestInput) -> Result<HttpResponse>;
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// `None` or a zero duration waits for the response indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(request_timeout(timeout))
            .build()
            .map_err(|e| RunnerError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpClient {
    fn send(&self, request: &RequestInput) -> Result<HttpResponse> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| RunnerError::InvalidRequest(format!("Invalid URL `{}`: {e}", request.url)))?;

        let mut req_builder = self
            .client
            .request(request.method.into(), url)
            .headers(build_headers(&request.headers)?);
        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let started = Instant::now();
        let response = req_builder
            .send()
            .map_err(|e| RunnerError::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = value.to_str().unwrap_or("<binary>");
                (name.to_string(), value.to_string())
            })
            .collect();
        let bytes = response
            .bytes()
            .map_err(|e| RunnerError::Transport(format!("Failed to read response: {e}")))?;
        let elapsed = started.elapsed().as_millis();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            duration_ms: elapsed,
            size_bytes: bytes.len(),
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// The blocking builder applies its own default when no timeout is set, so
/// an explicit `None` is always passed to switch it off.
fn request_timeout(configured: Option<Duration>) -> Option<Duration> {
    configured.filter(|t| !t.is_zero())
}

fn build_headers(input: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| RunnerError::InvalidRequest(format!("Invalid header key `{key}`: {e}")))?;
        let header_value = HeaderValue::from_str(value.trim()).map_err(|e| {
            RunnerError::InvalidRequest(format!("Invalid header value for `{key}`: {e}"))
        })?;
        headers.append(header_name, header_value);
    }

    Ok(headers)
}
