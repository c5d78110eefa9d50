//! Single HTTP step execution.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use canary_core::prelude::StepAbortError;
use canary_instruments::{report_operation, OperationRecord, Reporter};
use canary_summary_model::StepResult;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::CanaryResult;

const USER_AGENT_VALUE: &str = concat!("petsite-canary/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout, matching what the deployed canaries use.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Which response statuses count as a successful step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Expect {
    /// Exactly 200.
    #[default]
    Ok,
    /// Anything in 200..=399. Redirects are not followed, so a 302 from a web front end is healthy.
    Success,
    AnyOf(Vec<u16>),
}

impl Expect {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Expect::Ok => status == 200,
            Expect::Success => (200..400).contains(&status),
            Expect::AnyOf(statuses) => statuses.contains(&status),
        }
    }
}

/// A request for one step. The scheme, host and port come from the target URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Falls back to the runner's default when not set.
    pub timeout: Option<Duration>,
    pub expect: Expect,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            timeout: None,
            expect: Expect::default(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// A POST with an `application/x-www-form-urlencoded` body.
    pub fn post_form<K, V>(url: Url, fields: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();

        Self::new(Method::POST, url)
            .with_header(
                CONTENT_TYPE.as_str(),
                "application/x-www-form-urlencoded",
            )
            .with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }
}

/// Build an endpoint URL on the same scheme, host and port as `base`.
///
/// `path_and_query` should start with `/`, e.g. `/?selectedPetType=cat&selectedPetColor=black`.
pub fn endpoint(base: &Url, path_and_query: &str) -> CanaryResult<Url> {
    base.join(path_and_query)
        .with_context(|| format!("Invalid endpoint [{path_and_query}] for base URL {base}"))
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// The normalized step result together with the raw response, when one was received.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub result: StepResult,
    pub response: Option<HttpResponse>,
}

impl StepOutcome {
    pub fn success(&self) -> bool {
        self.result.success
    }

    pub fn status(&self) -> Option<u16> {
        self.result.status_code
    }

    pub fn body(&self) -> Option<&str> {
        self.response.as_ref().map(|r| r.body.as_str())
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> CanaryResult<T> {
        let body = self
            .body()
            .with_context(|| format!("Step [{}] has no response body", self.result.name))?;
        serde_json::from_str(body)
            .with_context(|| format!("Step [{}] did not return valid JSON", self.result.name))
    }
}

/// Executes HTTP steps. There is one of these per runner and it is passed to everything that needs
/// to talk to the target.
#[derive(Debug, Clone)]
pub struct HttpStepRunner {
    client: reqwest::Client,
    reporter: Arc<Reporter>,
    default_timeout: Duration,
}

impl HttpStepRunner {
    pub fn new(reporter: Arc<Reporter>, default_timeout: Duration) -> CanaryResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            reporter,
            default_timeout,
        })
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    /// Execute a request. Transport failures are captured in the result, this never fails.
    pub async fn execute(&self, name: &str, request: &HttpRequest) -> StepOutcome {
        let record = OperationRecord::new(name)
            .with_attr("method", &request.method)
            .with_attr("url", &request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(request.timeout.unwrap_or(self.default_timeout));
        for (header, value) in &request.headers {
            builder = builder.header(header, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        match Self::send(builder).await {
            Ok(response) => {
                let success = request.expect.accepts(response.status);
                let latency_ms = report_operation(
                    &self.reporter,
                    record.with_attr("status", response.status),
                    !success,
                );
                if success {
                    log::debug!("Step [{name}] returned {} in {latency_ms}ms", response.status);
                } else {
                    log::warn!(
                        "Step [{name}] returned unexpected status {} in {latency_ms}ms",
                        response.status
                    );
                }

                StepOutcome {
                    result: StepResult::completed(name, response.status, success, latency_ms),
                    response: Some(response),
                }
            }
            Err(e) => {
                let latency_ms = report_operation(&self.reporter, record, true);
                let error = describe_transport_error(&e);
                log::warn!("Step [{name}] failed after {latency_ms}ms: {error}");

                StepOutcome {
                    result: StepResult::transport_failure(name, latency_ms, error),
                    response: None,
                }
            }
        }
    }

    /// Execute a request that the rest of the scenario depends on. Anything other than a successful
    /// step is returned as a [StepAbortError].
    pub async fn execute_required(
        &self,
        name: &str,
        request: &HttpRequest,
    ) -> Result<StepOutcome, StepAbortError> {
        let outcome = self.execute(name, request).await;
        if outcome.success() {
            Ok(outcome)
        } else {
            Err(StepAbortError::new(name, outcome.result.failure_reason()))
        }
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<HttpResponse, reqwest::Error> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_string()
    } else {
        format!("connection error: {e}")
    }
}
