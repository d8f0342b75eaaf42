//! Report generation for collection runs
//!
//! Supports JUnit XML for CI/CD integration, plus JSON and TAP.

use junit_report::{Duration, Report, TestCase, TestSuite};
use std::fs::File;
use std::io::Write;
use time::OffsetDateTime;

use super::summary::{RequestExecutionResult, RunSummary};
use crate::errors::{FlowpulseError, Result};

/// Report format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// JUnit XML format (for CI/CD systems)
    JUnit,
    /// JSON format
    Json,
    /// TAP (Test Anything Protocol) format
    Tap,
}

/// Configuration for report generation
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Output file path
    pub output_path: String,

    /// Report format
    pub format: ReportFormat,

    /// Run name (used as test suite name)
    pub run_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: "report.xml".to_string(),
            format: ReportFormat::JUnit,
            run_name: "FlowPulse Run".to_string(),
        }
    }
}

/// Generate a report from a run summary
pub fn generate_report(summary: &RunSummary, config: &ReportConfig) -> Result<()> {
    match config.format {
        ReportFormat::JUnit => generate_junit_report(summary, config),
        ReportFormat::Json => generate_json_report(summary, config),
        ReportFormat::Tap => generate_tap_report(summary, config),
    }
}

/// Generate JUnit XML report
///
/// Each script test becomes a test case named `request / test`; a request
/// that failed before producing tests becomes a single error case.
pub fn generate_junit_report(summary: &RunSummary, config: &ReportConfig) -> Result<()> {
    let mut suite = TestSuite::new(&config.run_name);
    suite.set_timestamp(OffsetDateTime::now_utc());

    let classname = sanitize_classname(&config.run_name);

    for result in &summary.results {
        for case in build_test_cases(result, &classname) {
            suite.add_testcase(case);
        }
    }

    let mut report = Report::new();
    report.add_testsuite(suite);

    let file = File::create(&config.output_path).map_err(FlowpulseError::Io)?;

    report
        .write_xml(file)
        .map_err(|e| FlowpulseError::Report(format!("Failed to write JUnit XML: {}", e)))?;

    Ok(())
}

/// Build the JUnit test cases for one request record
fn build_test_cases(result: &RequestExecutionResult, classname: &str) -> Vec<TestCase> {
    let duration = Duration::milliseconds(result.duration_ms as i64);
    let mut cases = Vec::new();

    for test in &result.test_results {
        let case_name = format!("{} / {}", result.name, test.name);
        let mut case = if test.passed {
            TestCase::success(&case_name, duration)
        } else {
            TestCase::failure(
                &case_name,
                duration,
                "AssertionFailure",
                test.error.as_deref().unwrap_or("assertion failed"),
            )
        };
        case.set_classname(classname);
        cases.push(case);
    }

    if let Some(ref error) = result.error {
        let message = format!(
            "{}\nRequest: {} {}\nStatus: {} {}",
            error, result.method, result.url, result.status_code, result.status_text
        );
        let mut case = TestCase::error(&result.name, duration, "ExecutionError", &message);
        case.set_classname(classname);
        cases.push(case);
    } else if result.test_results.is_empty() {
        // A request with no scripts still shows up as one passing case
        let mut case = TestCase::success(&result.name, duration);
        case.set_classname(classname);
        cases.push(case);
    }

    cases
}

/// Sanitize a string for use as a JUnit classname
fn sanitize_classname(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// Generate JSON report
pub fn generate_json_report(summary: &RunSummary, config: &ReportConfig) -> Result<()> {
    use serde_json::json;

    let report = json!({
        "name": config.run_name,
        "collection_id": summary.collection_id,
        "started_at": summary.started_at.to_rfc3339(),
        "finished_at": summary.finished_at.map(|t| t.to_rfc3339()),
        "summary": {
            "total_requests": summary.total_requests,
            "completed_requests": summary.completed_requests,
            "failed_requests": summary.failed_requests,
            "total_tests": summary.total_tests,
            "passed_tests": summary.passed_tests,
            "failed_tests": summary.failed_tests,
        },
        "requests": summary.results.iter().map(|r| {
            json!({
                "id": r.request_id,
                "name": r.name,
                "method": r.method,
                "url": r.url,
                "status_code": r.status_code,
                "status_text": r.status_text,
                "duration_ms": r.duration_ms,
                "error": r.error,
                "tests": r.test_results.iter().map(|t| {
                    json!({
                        "name": t.name,
                        "passed": t.passed,
                        "error": t.error,
                    })
                }).collect::<Vec<_>>(),
                "logs": r.logs,
            })
        }).collect::<Vec<_>>(),
    });

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| FlowpulseError::Report(format!("Failed to serialize JSON: {}", e)))?;

    let mut file = File::create(&config.output_path).map_err(FlowpulseError::Io)?;
    file.write_all(json_str.as_bytes()).map_err(FlowpulseError::Io)?;

    Ok(())
}

/// Generate TAP (Test Anything Protocol) report
pub fn generate_tap_report(summary: &RunSummary, config: &ReportConfig) -> Result<()> {
    let mut output = String::new();

    output.push_str("TAP version 14\n");
    output.push_str(&format!("1..{}\n", summary.results.len()));

    for (i, result) in summary.results.iter().enumerate() {
        let test_num = i + 1;

        if !result.failed() && result.test_results.iter().all(|t| t.passed) {
            output.push_str(&format!(
                "ok {} - {} # time={}ms\n",
                test_num, result.name, result.duration_ms
            ));
        } else {
            output.push_str(&format!("not ok {} - {}\n", test_num, result.name));

            // Diagnostic info as a YAML block
            output.push_str("  ---\n");
            output.push_str(&format!("  method: {}\n", result.method));
            output.push_str(&format!("  url: {}\n", result.url));
            output.push_str(&format!("  status: {}\n", result.status_code));
            if let Some(ref error) = result.error {
                output.push_str(&format!("  error: {}\n", error));
            }

            let failed_tests: Vec<_> = result.test_results.iter().filter(|t| !t.passed).collect();
            if !failed_tests.is_empty() {
                output.push_str("  failures:\n");
                for test in failed_tests {
                    output.push_str(&format!(
                        "    - {}: {}\n",
                        test.name,
                        test.error.as_deref().unwrap_or("assertion failed")
                    ));
                }
            }

            output.push_str("  ...\n");
        }
    }

    let mut file = File::create(&config.output_path).map_err(FlowpulseError::Io)?;
    file.write_all(output.as_bytes()).map_err(FlowpulseError::Io)?;

    Ok(())
}
