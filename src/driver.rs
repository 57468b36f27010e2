//! HTTP and page clients driving the service under test.
//!
//! The driver issues requests against an already-running external service and
//! turns unexpected responses into typed step failures. It never retries: a
//! transient failure is a scenario failure, reported as-is. Session state (the
//! bearer token and the most recently created calculation id) flows forward
//! between ordered steps and is owned by a single scenario sequence.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{Config, Credentials};
use crate::markup;
use crate::operations::{results_match, Operation};

/// A single step failure, local to the scenario that raised it.
#[derive(Debug, Error)]
pub enum StepError {
    /// Transport-level failure: connection refused, timeout, malformed body.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a status the step did not expect.
    #[error("{context}: unexpected status {status}, body: {body}")]
    UnexpectedStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },

    /// A required field was absent from an otherwise successful response.
    #[error("response is missing field `{field}`, body: {body}")]
    MissingField { field: &'static str, body: String },

    /// An expected-versus-actual mismatch.
    #[error("{check}: expected {expected}, got {actual}")]
    Assertion {
        check: String,
        expected: String,
        actual: String,
    },

    /// An expected page condition never materialized within the wait budget.
    #[error("timed out after {waited:?} waiting for {condition}")]
    Timeout { condition: String, waited: Duration },

    /// A step ran before the state it depends on was produced.
    #[error("precondition not met: {needs}")]
    Precondition { needs: &'static str },
}

impl StepError {
    /// Whether the failure is an unmet precondition, i.e. an earlier gating
    /// step already failed and this step never really ran.
    pub fn is_precondition(&self) -> bool {
        matches!(self, StepError::Precondition { .. })
    }
}

/// Session state threaded through the ordered authenticated scenarios.
///
/// Identifiers are only ever produced by successful steps; no scenario mints
/// one out of thin air.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<String>,
    calc_id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Result<&str, StepError> {
        self.token.as_deref().ok_or(StepError::Precondition {
            needs: "a bearer token from a successful login",
        })
    }

    pub fn set_calc_id(&mut self, id: String) {
        self.calc_id = Some(id);
    }

    pub fn calc_id(&self) -> Result<&str, StepError> {
        self.calc_id.as_deref().ok_or(StepError::Precondition {
            needs: "a calculation id from a successful create",
        })
    }

    /// Forget the tracked calculation id after its resource is deleted.
    pub fn clear_calc_id(&mut self) -> Option<String> {
        self.calc_id.take()
    }
}

/// Calculation payload sent to the create and update endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalculationRequest {
    pub operation: Operation,
    pub a: f64,
    pub b: f64,
}

impl CalculationRequest {
    pub fn new(operation: Operation, a: f64, b: f64) -> Self {
        Self { operation, a, b }
    }
}

/// Calculation record as returned by the service. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculationRecord {
    pub id: String,
    pub result: f64,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
}

/// Direct HTTP client for the authentication and calculations endpoints.
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url, request_timeout: Duration) -> Result<Self, StepError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("calcprobe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url
    }

    /// Authenticate and return the bearer token. Succeeds only on a 2xx
    /// response carrying a non-empty `access_token`.
    pub async fn login(&self, credentials: &Credentials) -> Result<String, StepError> {
        let response = self
            .http
            .post(self.endpoint("/auth/login"))
            .json(&LoginRequest {
                username: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StepError::UnexpectedStatus {
                context: "login",
                status,
                body,
            });
        }

        let parsed: LoginResponse =
            serde_json::from_str(&body).map_err(|_| StepError::MissingField {
                field: "access_token",
                body: body.clone(),
            })?;
        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                debug!("login succeeded");
                Ok(token)
            }
            _ => Err(StepError::MissingField {
                field: "access_token",
                body,
            }),
        }
    }

    /// Create a calculation and verify the reported result against a local
    /// evaluation of the same operation.
    pub async fn create_calculation(
        &self,
        request: &CalculationRequest,
        token: &str,
    ) -> Result<CalculationRecord, StepError> {
        let response = self
            .http
            .post(self.endpoint("/calculations/"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StepError::UnexpectedStatus {
                context: "create calculation",
                status,
                body,
            });
        }

        let record: CalculationRecord =
            serde_json::from_str(&body).map_err(|_| StepError::MissingField {
                field: "id",
                body: body.clone(),
            })?;
        verify_result("created calculation result", request, record.result)?;
        debug!(id = %record.id, result = record.result, "calculation created");
        Ok(record)
    }

    /// List calculations; the response body must be a JSON array.
    pub async fn list_calculations(
        &self,
        token: &str,
    ) -> Result<Vec<CalculationRecord>, StepError> {
        let response = self
            .http
            .get(self.endpoint("/calculations/"))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StepError::UnexpectedStatus {
                context: "list calculations",
                status,
                body,
            });
        }

        serde_json::from_str::<Vec<CalculationRecord>>(&body).map_err(|_| StepError::Assertion {
            check: "list calculations body".to_string(),
            expected: "a JSON array of calculation records".to_string(),
            actual: body,
        })
    }

    /// Fetch a single calculation, returning the status alongside the parsed
    /// record so callers can assert on absence as well as presence.
    pub async fn get_calculation(
        &self,
        id: &str,
        token: &str,
    ) -> Result<(StatusCode, Option<CalculationRecord>), StepError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/calculations/{id}")))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Ok((status, None));
        }

        let record = serde_json::from_str(&body).map_err(|_| StepError::MissingField {
            field: "id",
            body,
        })?;
        Ok((status, Some(record)))
    }

    /// Update a calculation in place and verify the recomputed result.
    pub async fn update_calculation(
        &self,
        id: &str,
        request: &CalculationRequest,
        token: &str,
    ) -> Result<CalculationRecord, StepError> {
        let response = self
            .http
            .put(self.endpoint(&format!("/calculations/{id}")))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StepError::UnexpectedStatus {
                context: "update calculation",
                status,
                body,
            });
        }

        let record: CalculationRecord =
            serde_json::from_str(&body).map_err(|_| StepError::MissingField {
                field: "result",
                body: body.clone(),
            })?;
        verify_result("updated calculation result", request, record.result)?;
        debug!(id = %record.id, result = record.result, "calculation updated");
        Ok(record)
    }

    /// Delete a calculation; the service signals success with 204 exactly.
    pub async fn delete_calculation(&self, id: &str, token: &str) -> Result<(), StepError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/calculations/{id}")))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await?;
            return Err(StepError::UnexpectedStatus {
                context: "delete calculation",
                status,
                body,
            });
        }
        debug!(id, "calculation deleted");
        Ok(())
    }

    /// Status of a delete attempt, without treating non-204 as an error.
    /// Used to probe that a second delete of the same id does not succeed.
    pub async fn delete_calculation_status(
        &self,
        id: &str,
        token: &str,
    ) -> Result<StatusCode, StepError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/calculations/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(response.status())
    }

    /// Send a raw creation payload and return the status and body untouched.
    /// Used to probe rejection of invalid operations.
    pub async fn create_raw(
        &self,
        payload: &serde_json::Value,
        token: &str,
    ) -> Result<(StatusCode, String), StepError> {
        let response = self
            .http
            .post(self.endpoint("/calculations/"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Status of a list request carrying no credentials at all.
    pub async fn unauthenticated_list_status(&self) -> Result<StatusCode, StepError> {
        let response = self
            .http
            .get(self.endpoint("/calculations/"))
            .send()
            .await?;
        Ok(response.status())
    }
}

fn verify_result(check: &str, request: &CalculationRequest, actual: f64) -> Result<(), StepError> {
    let expected = request
        .operation
        .evaluate(request.a, request.b)
        .map_err(|err| StepError::Assertion {
            check: check.to_string(),
            expected: "an evaluable operand pair".to_string(),
            actual: err.to_string(),
        })?;
    if results_match(expected, actual) {
        Ok(())
    } else {
        Err(StepError::Assertion {
            check: format!(
                "{check} for {} {} {}",
                request.operation, request.a, request.b
            ),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Page navigator asserting on documents the service renders.
///
/// There is no scripted browser here: a form submission is modelled as the
/// HTTP POST of the empty form to the page path, and element visibility is
/// judged from the returned document. The visibility wait is bounded and
/// polled, never open-ended.
pub struct PageClient {
    http: Client,
    base: Url,
    wait_budget: Duration,
    poll_interval: Duration,
}

impl PageClient {
    pub fn new(
        base: Url,
        request_timeout: Duration,
        wait_budget: Duration,
        poll_interval: Duration,
    ) -> Result<Self, StepError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("calcprobe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            wait_budget,
            poll_interval,
        })
    }

    fn page_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url
    }

    async fn fetch_page(&self, path: &str, context: &'static str) -> Result<String, StepError> {
        let response = self.http.get(self.page_url(path)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StepError::UnexpectedStatus {
                context,
                status,
                body,
            });
        }
        Ok(body)
    }

    /// Navigate to a page and require its primary heading to contain the
    /// expected substring.
    pub async fn render_assertion(
        &self,
        path: &str,
        expected_heading: &str,
    ) -> Result<(), StepError> {
        let body = self.fetch_page(path, "render page").await?;
        let heading = markup::first_element(&body, "h1").ok_or_else(|| StepError::Assertion {
            check: format!("primary heading on {path}"),
            expected: format!("an h1 containing {expected_heading:?}"),
            actual: "no h1 element".to_string(),
        })?;

        if heading.text.contains(expected_heading) {
            trace!(path, heading = %heading.text, "heading matched");
            Ok(())
        } else {
            Err(StepError::Assertion {
                check: format!("primary heading on {path}"),
                expected: format!("text containing {expected_heading:?}"),
                actual: format!("{:?}", heading.text),
            })
        }
    }

    /// Navigate to a page, submit its form without filling any fields, and
    /// require the feedback element to become visible within the wait budget.
    pub async fn empty_submit_assertion(
        &self,
        path: &str,
        submit_selector: &str,
        message_selector: &str,
    ) -> Result<(), StepError> {
        let body = self.fetch_page(path, "render page").await?;
        if markup::element_by_id(&body, submit_selector).is_none() {
            return Err(StepError::Assertion {
                check: format!("submit control on {path}"),
                expected: format!("an element matching {submit_selector}"),
                actual: "no such element".to_string(),
            });
        }

        let started = Instant::now();
        loop {
            let response = self
                .http
                .post(self.page_url(path))
                .header("content-type", "application/x-www-form-urlencoded")
                .body("")
                .send()
                .await?;
            let document = response.text().await?;

            if let Some(message) = markup::element_by_id(&document, message_selector) {
                if message.is_visible() {
                    trace!(path, message = %message.text, "feedback message visible");
                    return Ok(());
                }
            }

            if started.elapsed() >= self.wait_budget {
                return Err(StepError::Timeout {
                    condition: format!("{message_selector} to become visible on {path}"),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Construct both clients from the harness configuration.
pub fn build_clients(config: &Config) -> Result<(ApiClient, PageClient), StepError> {
    let base = Url::parse(&config.target.base_url).map_err(|err| StepError::Assertion {
        check: "target.base_url".to_string(),
        expected: "a valid http(s) URL".to_string(),
        actual: format!("{} ({err})", config.target.base_url),
    })?;
    let request_timeout = Duration::from_millis(config.target.request_timeout_ms);
    let api = ApiClient::new(base.clone(), request_timeout)?;
    let pages = PageClient::new(
        base,
        request_timeout,
        Duration::from_millis(config.target.wait_budget_ms),
        Duration::from_millis(config.target.poll_interval_ms),
    )?;
    Ok((api, pages))
}
