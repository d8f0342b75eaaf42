//! Collection runner tests
//!
//! End-to-end runs against a wiremock server plus scripted-executor tests
//! for failure paths: variable threading, stop-on-error, progress events,
//! counters, and the pre-request short-circuit.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flowpulse::{
    Collection, CollectionRunner, ExecutedResponse, FlowpulseError, HttpExecutor,
    HttpExecutorOptions, InMemoryStore, KeyValue, PreparedRequest, RequestBody, RequestExecutor,
    RunEvent, RunnerConfig, SavedRequest,
};

fn http_executor() -> HttpExecutor {
    HttpExecutor::new(HttpExecutorOptions::default()).unwrap()
}

fn store_with(requests: Vec<SavedRequest>) -> InMemoryStore {
    let mut store = InMemoryStore::new();
    store.insert(Collection {
        id: "c1".to_string(),
        name: "Test Collection".to_string(),
        requests,
    });
    store
}

fn request(id: &str, method: &str, url: &str) -> SavedRequest {
    SavedRequest {
        id: id.to_string(),
        name: id.to_string(),
        method: method.to_string(),
        url: url.to_string(),
        ..Default::default()
    }
}

/// Executor that replays canned outcomes in order; `None` means a
/// network-level failure. Records every request it sees.
#[derive(Default)]
struct ScriptedExecutor {
    responses: Mutex<VecDeque<Option<ExecutedResponse>>>,
    seen: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedExecutor {
    fn new(responses: Vec<Option<ExecutedResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn ok(status: u16, body: serde_json::Value) -> Option<ExecutedResponse> {
        Some(ExecutedResponse {
            status,
            status_text: "OK".to_string(),
            headers: Default::default(),
            data: body,
        })
    }

    fn seen_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl RequestExecutor for ScriptedExecutor {
    async fn execute(&self, request: &PreparedRequest) -> flowpulse::Result<ExecutedResponse> {
        self.seen.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Some(response)) => Ok(response),
            _ => Err(FlowpulseError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}

// ============================================================================
// Sequential variable threading
// ============================================================================

#[tokio::test]
async fn test_variable_threading_between_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Ada"})))
        .mount(&server)
        .await;

    let mut login = request("login", "POST", &format!("{}/login", server.uri()));
    login.test_script = r#"
        const body = pm.response.json();
        pm.environment.set("token", body.token);
        pm.test("token present", () => pm.expect(body.token).to.exist);
    "#
    .to_string();

    let mut fetch_user = request(
        "fetch-user",
        "GET",
        &format!("{}/users/{{{{token}}}}", server.uri()),
    );
    fetch_user.test_script = r#"
        pm.test("status ok", () => pm.expect(pm.response).to.have.status(200));
    "#
    .to_string();

    let runner = CollectionRunner::new(store_with(vec![login, fetch_user]), http_executor()).unwrap();
    let summary = runner.run_collection(RunnerConfig::new("c1")).await.unwrap();

    assert_eq!(summary.completed_requests, 2);
    assert_eq!(summary.failed_requests, 0);
    assert!(summary.results[1].url.contains("/users/abc"));
    assert_eq!(summary.results[1].status_code, 200);
}

#[tokio::test]
async fn test_pre_request_variables_visible_in_same_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dynamic-path"))
        .and(query_param("page", "3"))
        .and(header("X-Trace", "trace-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut req = request("r1", "GET", &format!("{}/{{{{segment}}}}", server.uri()));
    req.pre_request_script = r#"
        pm.environment.set("segment", "dynamic-path");
        pm.environment.set("trace", "trace-1");
    "#
    .to_string();
    req.query = vec![KeyValue::new("page", "{{page}}")];
    req.headers = vec![KeyValue::new("X-Trace", "{{trace}}")];

    let runner = CollectionRunner::new(store_with(vec![req]), http_executor()).unwrap();

    let mut config = RunnerConfig::new("c1");
    config.initial_variables.insert("page".to_string(), "3".to_string());

    let summary = runner.run_collection(config).await.unwrap();
    assert_eq!(summary.failed_requests, 0, "results: {:?}", summary.results);
}

#[tokio::test]
async fn test_json_body_interpolation_survives_quotes() {
    let executor = ScriptedExecutor::new(vec![ScriptedExecutor::ok(200, json!({}))]);

    let mut req = request("r1", "POST", "https://api.example.com/users");
    req.body = Some(RequestBody::Json {
        text: r#"{"name": "{{display_name}}"}"#.to_string(),
    });

    let runner = CollectionRunner::new(store_with(vec![req]), &executor).unwrap();

    let mut config = RunnerConfig::new("c1");
    config
        .initial_variables
        .insert("display_name".to_string(), "Ada \"the\" Countess".to_string());

    runner.run_collection(config).await.unwrap();

    let seen = executor.seen.lock().unwrap();
    let body: serde_json::Value = serde_json::from_str(seen[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["name"], "Ada \"the\" Countess");
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_stop_on_error_halts_run() {
    let executor = ScriptedExecutor::new(vec![
        None, // request 1 fails at the network level
        ScriptedExecutor::ok(200, json!({})),
        ScriptedExecutor::ok(200, json!({})),
    ]);

    let requests = vec![
        request("r1", "GET", "https://api.example.com/a"),
        request("r2", "GET", "https://api.example.com/b"),
        request("r3", "GET", "https://api.example.com/c"),
    ];

    let runner = CollectionRunner::new(store_with(requests), &executor).unwrap();

    let mut config = RunnerConfig::new("c1");
    config.stop_on_error = true;

    let summary = runner.run_collection(config).await.unwrap();

    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.completed_requests, 1);
    assert_eq!(summary.failed_requests, 1);
    assert_eq!(summary.results[0].status_code, 0);
    assert_eq!(summary.results[0].status_text, "Network Error");
    assert!(summary.results[0].error.is_some());
    assert_eq!(executor.seen_count(), 1);
}

#[tokio::test]
async fn test_run_continues_past_failures_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "oops"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let requests = vec![
        request("bad", "GET", &format!("{}/bad", server.uri())),
        request("good", "GET", &format!("{}/good", server.uri())),
    ];

    let runner = CollectionRunner::new(store_with(requests), http_executor()).unwrap();
    let summary = runner.run_collection(RunnerConfig::new("c1")).await.unwrap();

    assert_eq!(summary.completed_requests, 2);
    assert_eq!(summary.failed_requests, 1);
    assert!(summary.results[0].failed());
    assert!(!summary.results[1].failed());
}

#[tokio::test]
async fn test_stop_on_error_skips_final_delay() {
    let executor = ScriptedExecutor::new(vec![None]);

    let requests = vec![
        request("r1", "GET", "https://api.example.com/a"),
        request("r2", "GET", "https://api.example.com/b"),
    ];

    let runner = CollectionRunner::new(store_with(requests), &executor).unwrap();

    let mut config = RunnerConfig::new("c1");
    config.stop_on_error = true;
    config.delay = Some(Duration::from_secs(5));

    let started = Instant::now();
    let summary = runner.run_collection(config).await.unwrap();

    // Breaking out of the run must not pay the inter-request delay
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(summary.results.len(), 1);
}

#[tokio::test]
async fn test_pre_request_failure_short_circuits_network() {
    let executor = ScriptedExecutor::new(vec![ScriptedExecutor::ok(200, json!({}))]);

    let mut failing = request("r1", "GET", "https://api.example.com/a");
    failing.pre_request_script = r#"
        pm.environment.set("partial", "survives");
        throw new Error("setup failed");
    "#
    .to_string();

    let mut follow_up = request("r2", "GET", "https://api.example.com/b");
    follow_up.pre_request_script = r#"
        pm.test("sees earlier update", () =>
            pm.expect(pm.environment.get("partial")).to.equal("survives"));
    "#
    .to_string();

    let runner = CollectionRunner::new(store_with(vec![failing, follow_up]), &executor).unwrap();
    let summary = runner.run_collection(RunnerConfig::new("c1")).await.unwrap();

    let first = &summary.results[0];
    assert_eq!(first.status_code, 0);
    assert_eq!(first.status_text, "Pre-request Script Error");
    assert_eq!(first.duration_ms, 0);
    assert_eq!(first.error.as_deref(), Some("setup failed"));

    // Only the second request reached the executor
    assert_eq!(executor.seen_count(), 1);

    // Partial variable updates from the failing script were folded in
    let second = &summary.results[1];
    assert!(second.test_results[0].passed, "results: {:?}", second.test_results);
}

#[tokio::test]
async fn test_test_script_error_keeps_recorded_tests() {
    let executor = ScriptedExecutor::new(vec![ScriptedExecutor::ok(200, json!({}))]);

    let mut req = request("r1", "GET", "https://api.example.com/a");
    req.test_script = r#"
        pm.test("recorded before the crash", () => {});
        undefinedFunction();
    "#
    .to_string();

    let runner = CollectionRunner::new(store_with(vec![req]), &executor).unwrap();
    let summary = runner.run_collection(RunnerConfig::new("c1")).await.unwrap();

    let result = &summary.results[0];
    assert_eq!(result.test_results.len(), 1);
    assert!(result.test_results[0].passed);
    assert!(result.error.as_deref().unwrap().starts_with("Test script error:"));
    assert!(result.logs.iter().any(|l| l.starts_with("Test script error:")));

    // The request still counts as failed for the summary
    assert_eq!(summary.failed_requests, 1);
    assert_eq!(summary.total_tests, 1);
    assert_eq!(summary.passed_tests, 1);
}

#[tokio::test]
async fn test_unknown_collection_rejects_before_any_event() {
    let runner = CollectionRunner::new(InMemoryStore::new(), http_executor()).unwrap();

    let mut events = Vec::new();
    let result = runner
        .run(RunnerConfig::new("missing"), |event| events.push(event))
        .await;

    assert!(matches!(result, Err(FlowpulseError::NotFound(_))));
    assert!(events.is_empty());
}

// ============================================================================
// Progress events and counters
// ============================================================================

#[tokio::test]
async fn test_progress_event_sequence() {
    let executor = ScriptedExecutor::new(vec![
        ScriptedExecutor::ok(200, json!({})),
        ScriptedExecutor::ok(200, json!({})),
    ]);

    let requests = vec![
        request("r1", "GET", "https://api.example.com/a"),
        request("r2", "GET", "https://api.example.com/b"),
    ];

    let runner = CollectionRunner::new(store_with(requests), &executor).unwrap();

    let mut events = Vec::new();
    runner
        .run(RunnerConfig::new("c1"), |event| events.push(event))
        .await
        .unwrap();

    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], RunEvent::Started { .. }));
    assert!(matches!(events[1], RunEvent::RequestStarted { index: 0, .. }));
    assert!(matches!(events[2], RunEvent::RequestCompleted { index: 0, .. }));
    assert!(matches!(events[3], RunEvent::RequestStarted { index: 1, .. }));
    assert!(matches!(events[4], RunEvent::RequestCompleted { index: 1, .. }));
    assert!(matches!(events[5], RunEvent::Completed { .. }));

    // Snapshots reflect progress at emission time
    if let RunEvent::RequestCompleted { summary, .. } = &events[2] {
        assert_eq!(summary.completed_requests, 1);
        assert!(summary.finished_at.is_none());
    }
    if let RunEvent::Completed { summary } = &events[5] {
        assert_eq!(summary.completed_requests, 2);
        assert!(summary.finished_at.is_some());
    }
}

#[tokio::test]
async fn test_counter_consistency() {
    let executor = ScriptedExecutor::new(vec![
        ScriptedExecutor::ok(200, json!({})),
        ScriptedExecutor::ok(200, json!({})),
    ]);

    let mut first = request("r1", "GET", "https://api.example.com/a");
    first.test_script = r#"
        pm.test("one", () => {});
        pm.test("two", () => pm.expect(1).to.equal(2));
    "#
    .to_string();

    let mut second = request("r2", "GET", "https://api.example.com/b");
    second.test_script = r#"pm.test("three", () => {});"#.to_string();

    let runner = CollectionRunner::new(store_with(vec![first, second]), &executor).unwrap();
    let summary = runner.run_collection(RunnerConfig::new("c1")).await.unwrap();

    let per_request: usize = summary.results.iter().map(|r| r.test_results.len()).sum();
    assert_eq!(summary.total_tests, per_request);
    assert_eq!(summary.passed_tests + summary.failed_tests, summary.total_tests);
    assert_eq!(summary.passed_tests, 2);
    assert_eq!(summary.failed_tests, 1);
}

#[tokio::test]
async fn test_inter_request_delay_applies() {
    let executor = ScriptedExecutor::new(vec![
        ScriptedExecutor::ok(200, json!({})),
        ScriptedExecutor::ok(200, json!({})),
    ]);

    let requests = vec![
        request("r1", "GET", "https://api.example.com/a"),
        request("r2", "GET", "https://api.example.com/b"),
    ];

    let runner = CollectionRunner::new(store_with(requests), &executor).unwrap();

    let mut config = RunnerConfig::new("c1");
    config.delay = Some(Duration::from_millis(150));

    let started = Instant::now();
    runner.run_collection(config).await.unwrap();

    // One delay between the two requests, none after the last
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(150), "elapsed: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(450), "elapsed: {elapsed:?}");
}

// ============================================================================
// Validation and reports
// ============================================================================

#[tokio::test]
async fn test_validate_reports_script_problems() {
    let mut broken = request("r1", "GET", "https://api.example.com/a");
    broken.test_script = "const x = ".to_string();

    let mut no_url = request("r2", "GET", "");
    no_url.url = String::new();

    let runner = CollectionRunner::new(store_with(vec![broken, no_url]), http_executor()).unwrap();

    let problems = runner.validate("c1").unwrap();
    assert_eq!(problems.len(), 2);
    assert!(problems[0].contains("test script"));
    assert!(problems[1].contains("no URL"));

    assert!(matches!(
        runner.validate("missing"),
        Err(FlowpulseError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_summary_feeds_reports() {
    let executor = ScriptedExecutor::new(vec![ScriptedExecutor::ok(200, json!({}))]);

    let mut req = request("r1", "GET", "https://api.example.com/a");
    req.test_script = r#"pm.test("passes", () => {});"#.to_string();

    let runner = CollectionRunner::new(store_with(vec![req]), &executor).unwrap();
    let summary = runner.run_collection(RunnerConfig::new("c1")).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.xml");

    flowpulse::generate_report(
        &summary,
        &flowpulse::ReportConfig {
            output_path: path.to_string_lossy().to_string(),
            format: flowpulse::ReportFormat::JUnit,
            run_name: "CI Run".to_string(),
        },
    )
    .unwrap();

    let xml = std::fs::read_to_string(&path).unwrap();
    assert!(xml.contains("r1 / passes"));

    let rendered = flowpulse::format_run_summary(&summary);
    assert!(rendered.contains("SUMMARY"));
    assert!(rendered.contains("1 total, 1 passed, 0 failed"));
}
