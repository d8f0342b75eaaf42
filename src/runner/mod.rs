//! Collection run engine
//!
//! Runs every request of a collection in stored order, threading one
//! mutable variable environment through the pre-request script, the
//! interpolated network call, and the test script of each request.

pub mod report;
pub mod summary;

pub use report::{generate_report, ReportConfig, ReportFormat};
pub use summary::{RequestExecutionResult, RunSummary};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::errors::{FlowpulseError, Result};
use crate::executor::{PreparedRequest, RequestExecutor};
use crate::interpolate::interpolate;
use crate::magic::expand_dynamic_values;
use crate::models::{RequestBody, SavedRequest};
use crate::scripting::{ResponseContext, ScriptContext, ScriptSandbox};
use crate::store::RequestStore;

/// Configuration for one collection run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Collection to run
    pub collection_id: String,

    /// Starting variable environment
    pub initial_variables: HashMap<String, String>,

    /// Pause between consecutive requests
    pub delay: Option<Duration>,

    /// Abort the run after the first failed request
    pub stop_on_error: bool,
}

impl RunnerConfig {
    pub fn new(collection_id: &str) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            initial_variables: HashMap::new(),
            delay: None,
            stop_on_error: false,
        }
    }
}

/// Progress events emitted over a run
///
/// Each event carries its own cloned [`RunSummary`] snapshot, so observers
/// never alias the runner's working state.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// The run is about to execute its first request
    Started { summary: RunSummary },

    /// A request is about to run its pipeline
    RequestStarted {
        index: usize,
        total: usize,
        request_id: String,
        name: String,
    },

    /// A request's full pipeline finished and was folded into the summary
    RequestCompleted {
        index: usize,
        total: usize,
        result: RequestExecutionResult,
        summary: RunSummary,
    },

    /// The run is over; the summary carries its end timestamp
    Completed { summary: RunSummary },
}

/// Runs collections sequentially against an injected store and executor
pub struct CollectionRunner<S, E> {
    store: S,
    executor: E,
    sandbox: ScriptSandbox,
}

impl<S: RequestStore, E: RequestExecutor> CollectionRunner<S, E> {
    pub fn new(store: S, executor: E) -> Result<Self> {
        Ok(Self {
            store,
            executor,
            sandbox: ScriptSandbox::new()?,
        })
    }

    /// Run a collection, reporting progress through `on_progress`.
    ///
    /// Fails only when the collection id is unknown; per-request failures
    /// are recorded in the summary and the run keeps going (unless
    /// `stop_on_error` is set).
    pub async fn run<F>(&self, config: RunnerConfig, mut on_progress: F) -> Result<RunSummary>
    where
        F: FnMut(RunEvent),
    {
        let collection = self
            .store
            .collection(&config.collection_id)
            .ok_or_else(|| FlowpulseError::NotFound(config.collection_id.clone()))?;

        let total = collection.requests.len();
        let mut summary = RunSummary::new(&config.collection_id, total);
        let mut variables = config.initial_variables.clone();

        info!(collection = %collection.name, requests = total, "starting collection run");
        on_progress(RunEvent::Started {
            summary: summary.clone(),
        });

        for (index, request) in collection.requests.iter().enumerate() {
            on_progress(RunEvent::RequestStarted {
                index,
                total,
                request_id: request.id.clone(),
                name: request.name.clone(),
            });

            let result = self.execute_request(request, &mut variables).await;
            let failed = result.failed();
            summary.record(result.clone());

            on_progress(RunEvent::RequestCompleted {
                index,
                total,
                result,
                summary: summary.clone(),
            });

            if config.stop_on_error && failed {
                info!(request = %request.name, "stopping run on failed request");
                break;
            }

            // The delay separates two requests that will both execute; a
            // stopping failure above never waits
            if index + 1 < total {
                if let Some(delay) = config.delay {
                    if !delay.is_zero() {
                        debug!(delay_ms = delay.as_millis() as u64, "inter-request delay");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        summary.finished_at = Some(Utc::now());
        on_progress(RunEvent::Completed {
            summary: summary.clone(),
        });

        Ok(summary)
    }

    /// Run a collection without observing progress
    pub async fn run_collection(&self, config: RunnerConfig) -> Result<RunSummary> {
        self.run(config, |_| {}).await
    }

    /// Pre-flight a collection without executing anything.
    ///
    /// Returns a list of problems: script syntax errors and structurally
    /// unusable requests.
    pub fn validate(&self, collection_id: &str) -> Result<Vec<String>> {
        let collection = self
            .store
            .collection(collection_id)
            .ok_or_else(|| FlowpulseError::NotFound(collection_id.to_string()))?;

        let mut problems = Vec::new();

        for request in &collection.requests {
            if request.url.trim().is_empty() {
                problems.push(format!("{}: request has no URL", request.name));
            }

            if !request.pre_request_script.trim().is_empty() {
                if let Err(err) = self.sandbox.check(&request.pre_request_script) {
                    problems.push(format!("{}: pre-request script: {}", request.name, err));
                }
            }

            if !request.test_script.trim().is_empty() {
                if let Err(err) = self.sandbox.check(&request.test_script) {
                    problems.push(format!("{}: test script: {}", request.name, err));
                }
            }
        }

        Ok(problems)
    }

    /// Run one request through its full pipeline:
    /// pre-request script → interpolate → network → test script
    async fn execute_request(
        &self,
        request: &SavedRequest,
        variables: &mut HashMap<String, String>,
    ) -> RequestExecutionResult {
        let mut logs = Vec::new();
        let mut test_results = Vec::new();

        if !request.pre_request_script.trim().is_empty() {
            let outcome = self.sandbox.execute(
                &request.pre_request_script,
                &ScriptContext::for_pre_request(variables.clone()),
            );

            // Partial variable updates survive even a failing script
            *variables = outcome.updated_variables;
            logs.extend(outcome.logs);
            test_results.extend(outcome.test_results);

            if let Some(err) = outcome.error {
                warn!(request = %request.name, error = %err, "pre-request script failed");
                return RequestExecutionResult {
                    request_id: request.id.clone(),
                    name: request.name.clone(),
                    method: request.method.clone(),
                    url: request.url.clone(),
                    status_code: 0,
                    status_text: "Pre-request Script Error".to_string(),
                    duration_ms: 0,
                    test_results,
                    logs,
                    error: Some(err),
                };
            }
        }

        let url = resolve_url(request, variables);
        let prepared = PreparedRequest {
            method: request.method.clone(),
            url: url.clone(),
            headers: resolve_headers(request, variables),
            body: resolve_body(request, variables),
        };

        debug!(method = %prepared.method, url = %prepared.url, "sending request");
        let started = Instant::now();

        let response = match self.executor.execute(&prepared).await {
            Ok(response) => response,
            Err(err) => {
                warn!(request = %request.name, error = %err, "network call failed");
                return RequestExecutionResult {
                    request_id: request.id.clone(),
                    name: request.name.clone(),
                    method: request.method.clone(),
                    url,
                    status_code: 0,
                    status_text: "Network Error".to_string(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    test_results,
                    logs,
                    error: Some(err.to_string()),
                };
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let mut error = None;

        if !request.test_script.trim().is_empty() {
            let response_context = ResponseContext {
                status: response.status,
                status_text: response.status_text.clone(),
                headers: response.headers.clone(),
                body: response.data.clone(),
                metadata: None,
                trailers: None,
                grpc_status: None,
            };

            let outcome = self.sandbox.execute(
                &request.test_script,
                &ScriptContext::for_test(variables.clone(), response_context),
            );

            *variables = outcome.updated_variables;
            test_results.extend(outcome.test_results);
            logs.extend(outcome.logs);

            // A sandbox-level failure is surfaced on the request without
            // erasing test results already produced
            if let Some(err) = outcome.error {
                warn!(request = %request.name, error = %err, "test script failed");
                let message = format!("Test script error: {}", err);
                logs.push(message.clone());
                error = Some(message);
            }
        }

        RequestExecutionResult {
            request_id: request.id.clone(),
            name: request.name.clone(),
            method: request.method.clone(),
            url,
            status_code: response.status,
            status_text: response.status_text,
            duration_ms,
            test_results,
            logs,
            error,
        }
    }
}

/// Interpolate variables, then expand dynamic `{{$...}}` values
fn resolve_template(text: &str, variables: &HashMap<String, String>) -> String {
    expand_dynamic_values(&interpolate(text, variables))
}

/// Resolve the URL template and append active query parameters
fn resolve_url(request: &SavedRequest, variables: &HashMap<String, String>) -> String {
    let base = resolve_template(&request.url, variables);

    let pairs: Vec<(String, String)> = request
        .query
        .iter()
        .filter(|kv| kv.active)
        .map(|kv| {
            (
                resolve_template(&kv.key, variables),
                resolve_template(&kv.value, variables),
            )
        })
        .collect();

    if pairs.is_empty() {
        return base;
    }

    match url::Url::parse(&base) {
        Ok(mut url) => {
            {
                let mut query = url.query_pairs_mut();
                for (key, value) in &pairs {
                    query.append_pair(key, value);
                }
            }
            url.to_string()
        }
        // Leave an unparseable URL alone; the executor reports it
        Err(_) => base,
    }
}

/// Resolve active headers, adding a Content-Type for the body mode when
/// none is set explicitly
fn resolve_headers(request: &SavedRequest, variables: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|kv| kv.active)
        .map(|kv| {
            (
                resolve_template(&kv.key, variables),
                resolve_template(&kv.value, variables),
            )
        })
        .collect();

    if let Some(ref body) = request.body {
        let has_content_type = headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            headers.push(("Content-Type".to_string(), body.content_type().to_string()));
        }
    }

    headers
}

/// Resolve the request body for its mode
fn resolve_body(request: &SavedRequest, variables: &HashMap<String, String>) -> Option<String> {
    match request.body {
        None => None,
        Some(RequestBody::Raw { ref text }) => Some(resolve_template(text, variables)),
        Some(RequestBody::Json { ref text }) => {
            // Interpolate after parsing so variable values cannot corrupt
            // the structure; unparseable text falls back to whole-text
            // interpolation
            match serde_json::from_str::<JsonValue>(text) {
                Ok(parsed) => {
                    let resolved = resolve_json(&parsed, variables);
                    Some(serde_json::to_string(&resolved).unwrap_or_else(|_| text.clone()))
                }
                Err(_) => Some(resolve_template(text, variables)),
            }
        }
        Some(RequestBody::Form { ref fields }) => {
            let pairs: Vec<(String, String)> = fields
                .iter()
                .filter(|kv| kv.active)
                .map(|kv| {
                    (
                        resolve_template(&kv.key, variables),
                        resolve_template(&kv.value, variables),
                    )
                })
                .collect();
            Some(serde_urlencoded::to_string(&pairs).unwrap_or_default())
        }
    }
}

/// Resolve every string scalar in a parsed JSON body
fn resolve_json(value: &JsonValue, variables: &HashMap<String, String>) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(resolve_template(s, variables)),
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().map(|v| resolve_json(v, variables)).collect())
        }
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_json(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn truncate_url(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let target_len = max_len - 3;
    let mut truncate_at = target_len.min(s.len());
    while truncate_at > 0 && !s.is_char_boundary(truncate_at) {
        truncate_at -= 1;
    }
    format!("{}...", &s[..truncate_at])
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    use std::fmt::Write;

    let mut output = String::new();

    writeln!(output, "\n{}", "=".repeat(80)).unwrap();
    writeln!(output, "COLLECTION RUN RESULTS").unwrap();
    writeln!(output, "{}\n", "=".repeat(80)).unwrap();

    writeln!(
        output,
        "{:<4} {:<7} {:<38} {:<8} {:<8} {:<10}",
        "#", "Method", "URL", "Status", "Time", "Tests"
    )
    .unwrap();
    writeln!(output, "{}", "-".repeat(80)).unwrap();

    for (index, result) in summary.results.iter().enumerate() {
        let url_display = truncate_url(&result.url, 36);

        let status_display = if result.status_code == 0 {
            "ERR".to_string()
        } else {
            result.status_code.to_string()
        };

        let passed = result.test_results.iter().filter(|t| t.passed).count();
        let tests_display = if result.test_results.is_empty() {
            "-".to_string()
        } else {
            format!("{}/{}", passed, result.test_results.len())
        };

        writeln!(
            output,
            "{:<4} {:<7} {:<38} {:<8} {:<8} {:<10}",
            index + 1,
            result.method,
            url_display,
            status_display,
            format!("{}ms", result.duration_ms),
            tests_display
        )
        .unwrap();

        if let Some(ref error) = result.error {
            writeln!(output, "     Error: {}", error).unwrap();
        }
        for test in result.test_results.iter().filter(|t| !t.passed) {
            writeln!(
                output,
                "     Failed: {} ({})",
                test.name,
                test.error.as_deref().unwrap_or("no details")
            )
            .unwrap();
        }
    }

    writeln!(output, "\n{}", "-".repeat(80)).unwrap();
    writeln!(output, "SUMMARY").unwrap();
    writeln!(
        output,
        "  Requests:  {} total, {} completed, {} failed",
        summary.total_requests, summary.completed_requests, summary.failed_requests
    )
    .unwrap();
    writeln!(
        output,
        "  Tests:     {} total, {} passed, {} failed",
        summary.total_tests, summary.passed_tests, summary.failed_tests
    )
    .unwrap();
    if let Some(finished_at) = summary.finished_at {
        let elapsed = finished_at.signed_duration_since(summary.started_at);
        writeln!(output, "  Duration:  {}ms", elapsed.num_milliseconds()).unwrap();
    }

    output
}
