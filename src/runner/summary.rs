//! Run summary and per-request result types

use chrono::{DateTime, Utc};

use crate::scripting::TestResult;

/// Per-request record of one collection run
#[derive(Debug, Clone)]
pub struct RequestExecutionResult {
    /// Saved request id
    pub request_id: String,

    /// Request display name
    pub name: String,

    /// HTTP method
    pub method: String,

    /// Resolved URL (after interpolation), query string included
    pub url: String,

    /// Response status code; 0 when the request never produced a response
    pub status_code: u16,

    /// Status reason phrase, or a failure label ("Network Error",
    /// "Pre-request Script Error")
    pub status_text: String,

    /// Wall-clock duration of the network call in milliseconds
    pub duration_ms: u64,

    /// Test outcomes from this request's scripts, in invocation order
    pub test_results: Vec<TestResult>,

    /// Captured console output from both scripts
    pub logs: Vec<String>,

    /// Network failure, pre-request script failure, or test-script failure
    pub error: Option<String>,
}

impl RequestExecutionResult {
    /// A request failed if it carries an error or came back with a 4xx/5xx
    pub fn failed(&self) -> bool {
        self.error.is_some() || self.status_code >= 400
    }
}

/// Aggregate outcome of a collection run
///
/// Mutated in place as the run progresses; once `finished_at` is set the
/// run is over and the summary no longer changes.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Collection that was run
    pub collection_id: String,

    /// Number of requests in the collection
    pub total_requests: usize,

    /// Requests that ran to a recorded result
    pub completed_requests: usize,

    /// Requests with an error or a 4xx/5xx status
    pub failed_requests: usize,

    /// Test counters across all requests
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,

    /// Per-request records, in execution order
    pub results: Vec<RequestExecutionResult>,

    /// Run start time
    pub started_at: DateTime<Utc>,

    /// Run end time; set once, when the run completes
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn new(collection_id: &str, total_requests: usize) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            total_requests,
            completed_requests: 0,
            failed_requests: 0,
            total_tests: 0,
            passed_tests: 0,
            failed_tests: 0,
            results: Vec::with_capacity(total_requests),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Fold one request record into the counters and result list
    pub fn record(&mut self, result: RequestExecutionResult) {
        self.completed_requests += 1;
        if result.failed() {
            self.failed_requests += 1;
        }

        for test in &result.test_results {
            self.total_tests += 1;
            if test.passed {
                self.passed_tests += 1;
            } else {
                self.failed_tests += 1;
            }
        }

        self.results.push(result);
    }

    /// True once every request completed without failure
    pub fn all_passed(&self) -> bool {
        self.failed_requests == 0 && self.completed_requests == self.total_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(status: u16, error: Option<&str>, tests: &[bool]) -> RequestExecutionResult {
        RequestExecutionResult {
            request_id: "r".to_string(),
            name: "r".to_string(),
            method: "GET".to_string(),
            url: "https://example.com".to_string(),
            status_code: status,
            status_text: "OK".to_string(),
            duration_ms: 1,
            test_results: tests
                .iter()
                .enumerate()
                .map(|(i, &passed)| TestResult {
                    name: format!("t{}", i),
                    passed,
                    error: (!passed).then(|| "failed".to_string()),
                })
                .collect(),
            logs: Vec::new(),
            error: error.map(|e| e.to_string()),
        }
    }

    #[test]
    fn test_counter_folding() {
        let mut summary = RunSummary::new("c1", 2);
        summary.record(result_with(200, None, &[true, true]));
        summary.record(result_with(500, None, &[false]));

        assert_eq!(summary.completed_requests, 2);
        assert_eq!(summary.failed_requests, 1);
        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.passed_tests, 2);
        assert_eq!(summary.failed_tests, 1);
        assert_eq!(summary.passed_tests + summary.failed_tests, summary.total_tests);
    }

    #[test]
    fn test_failed_policy() {
        assert!(result_with(0, Some("Network Error"), &[]).failed());
        assert!(result_with(404, None, &[]).failed());
        assert!(!result_with(200, None, &[false]).failed());
    }
}
