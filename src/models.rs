//! Saved request and collection models
//!
//! These types form the contract with the request store: a collection is an
//! ordered list of saved requests, each carrying its own scripts.

use serde::{Deserialize, Serialize};

/// A named, ordered group of saved requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Collection id
    pub id: String,

    /// Display name
    pub name: String,

    /// Requests in stored order
    pub requests: Vec<SavedRequest>,
}

/// A single saved request with its attached scripts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedRequest {
    /// Request id
    pub id: String,

    /// Display name
    pub name: String,

    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    #[serde(default = "default_method")]
    pub method: String,

    /// URL template (may contain `{{variable}}` tokens)
    pub url: String,

    /// Request headers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyValue>,

    /// Query parameters (appended to the URL)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<KeyValue>,

    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,

    /// Script run before the request is sent
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pre_request_script: String,

    /// Script run after the response arrives
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub test_script: String,
}

/// A key/value pair with an inclusion flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,

    /// Inactive pairs are kept in the model but not sent
    #[serde(default = "default_active")]
    pub active: bool,
}

impl KeyValue {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            active: true,
        }
    }
}

/// Request body by mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RequestBody {
    /// Raw text, sent as-is after interpolation
    Raw { text: String },

    /// JSON text; interpolation is applied per string scalar after parsing
    /// so variable values cannot corrupt the structure
    Json { text: String },

    /// URL-encoded form fields
    Form { fields: Vec<KeyValue> },
}

impl RequestBody {
    /// Default Content-Type for this body mode
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Raw { .. } => "text/plain",
            RequestBody::Json { .. } => "application/json",
            RequestBody::Form { .. } => "application/x-www-form-urlencoded",
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_active() -> bool {
    true
}
