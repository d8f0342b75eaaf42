//! Request execution primitive
//!
//! The runner does not parse HTTP itself; it hands a fully resolved request
//! to a [`RequestExecutor`] and gets back a normalized response. The default
//! implementation is a thin reqwest client, but anything honoring the
//! contract can be injected (a proxy endpoint, a recording stub, a gRPC
//! bridge).

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value as JsonValue;

use crate::errors::{FlowpulseError, Result};

/// A fully resolved request, ready to send
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: String,

    /// Resolved URL, query string included
    pub url: String,

    /// Headers to send
    pub headers: Vec<(String, String)>,

    /// Serialized body, if any
    pub body: Option<String>,
}

/// A normalized response from the execution primitive
#[derive(Debug, Clone)]
pub struct ExecutedResponse {
    /// HTTP status code
    pub status: u16,

    /// Status reason phrase
    pub status_text: String,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Response payload, parsed as JSON when possible, otherwise a string
    pub data: JsonValue,
}

/// Executes one prepared request and returns a normalized response.
pub trait RequestExecutor {
    fn execute(
        &self,
        request: &PreparedRequest,
    ) -> impl std::future::Future<Output = Result<ExecutedResponse>> + Send;
}

impl<E: RequestExecutor> RequestExecutor for &E {
    fn execute(
        &self,
        request: &PreparedRequest,
    ) -> impl std::future::Future<Output = Result<ExecutedResponse>> + Send {
        (**self).execute(request)
    }
}

/// Options for the default HTTP executor
#[derive(Debug, Clone)]
pub struct HttpExecutorOptions {
    /// Timeout for each request
    pub timeout: Option<Duration>,

    /// Follow redirects
    pub follow_redirects: bool,
}

impl Default for HttpExecutorOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            follow_redirects: true,
        }
    }
}

/// Default executor backed by reqwest
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(options: HttpExecutorOptions) -> Result<Self> {
        let mut builder = Client::builder();

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        if !options.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        let client = builder.build().map_err(FlowpulseError::Request)?;

        Ok(Self { client })
    }
}

impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: &PreparedRequest) -> Result<ExecutedResponse> {
        let method = request.method.parse::<Method>().map_err(|_| {
            FlowpulseError::Argument(format!("Invalid HTTP method: {}", request.method))
        })?;

        // Fail fast on an unparseable URL instead of letting reqwest produce
        // a less specific error later
        url::Url::parse(&request.url)?;

        let mut builder = self.client.request(method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(FlowpulseError::Request)?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let text = response.text().await.map_err(FlowpulseError::Request)?;

        // Test scripts decide how to treat the payload; hand them parsed
        // JSON when the body is JSON, the raw text otherwise
        let data = match serde_json::from_str::<JsonValue>(&text) {
            Ok(json) => json,
            Err(_) => JsonValue::String(text),
        };

        Ok(ExecutedResponse {
            status,
            status_text,
            headers,
            data,
        })
    }
}
