//! Script execution context
//!
//! Provides the per-invocation input bundle (variables, optional response)
//! and the output types produced by a sandbox run.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Response data available to test scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseContext {
    /// HTTP status code
    pub status: u16,

    /// Status reason phrase
    pub status_text: String,

    /// Response headers (case-sensitive mapping)
    pub headers: HashMap<String, String>,

    /// Deserialized response body
    pub body: JsonValue,

    /// gRPC-style metadata, when the protocol carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,

    /// gRPC-style trailers, when the protocol carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailers: Option<HashMap<String, String>>,

    /// gRPC status code and details, when the protocol carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_status: Option<GrpcStatus>,
}

impl ResponseContext {
    /// Create a new response context with no protocol extensions
    pub fn new(status: u16, status_text: &str, body: JsonValue) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            headers: HashMap::new(),
            body,
            metadata: None,
            trailers: None,
            grpc_status: None,
        }
    }

    /// Get a header value (case-insensitive lookup)
    pub fn get_header(&self, key: &str) -> Option<&String> {
        let key_lower = key.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == key_lower)
            .map(|(_, v)| v)
    }
}

/// gRPC terminal status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcStatus {
    pub code: i32,
    pub details: String,
}

/// Immutable per-invocation input for the sandbox
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    /// Variable environment snapshot
    variables: HashMap<String, String>,

    /// Response context; absent for pre-request scripts
    response: Option<ResponseContext>,
}

impl ScriptContext {
    /// Context for a pre-request script (no response exists yet)
    pub fn for_pre_request(variables: HashMap<String, String>) -> Self {
        Self {
            variables,
            response: None,
        }
    }

    /// Context for a test script
    pub fn for_test(variables: HashMap<String, String>, response: ResponseContext) -> Self {
        Self {
            variables,
            response: Some(response),
        }
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn response(&self) -> Option<&ResponseContext> {
        self.response.as_ref()
    }
}

/// Outcome of one `pm.test(name, fn)` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a sandbox invocation produces
#[derive(Debug, Clone, Default)]
pub struct ScriptExecutionResult {
    /// Full replacement variable map (starting copy plus mutations)
    pub updated_variables: HashMap<String, String>,

    /// Test outcomes in invocation order
    pub test_results: Vec<TestResult>,

    /// Captured console output
    pub logs: Vec<String>,

    /// Set only when the script failed outside a `pm.test` wrapper
    pub error: Option<String>,
}

impl ScriptExecutionResult {
    /// Number of passed tests
    pub fn passed_count(&self) -> usize {
        self.test_results.iter().filter(|t| t.passed).count()
    }

    /// Number of failed tests
    pub fn failed_count(&self) -> usize {
        self.test_results.iter().filter(|t| !t.passed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_request_context_has_no_response() {
        let ctx = ScriptContext::for_pre_request(HashMap::new());
        assert!(ctx.response().is_none());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut response = ResponseContext::new(200, "OK", JsonValue::Null);
        response
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());

        assert_eq!(
            response.get_header("content-type"),
            Some(&"application/json".to_string())
        );
        assert!(response.get_header("x-missing").is_none());
    }

    #[test]
    fn test_result_counts() {
        let result = ScriptExecutionResult {
            test_results: vec![
                TestResult {
                    name: "a".into(),
                    passed: true,
                    error: None,
                },
                TestResult {
                    name: "b".into(),
                    passed: false,
                    error: Some("expected 1 to equal 2".into()),
                },
            ],
            ..Default::default()
        };

        assert_eq!(result.passed_count(), 1);
        assert_eq!(result.failed_count(), 1);
    }
}
