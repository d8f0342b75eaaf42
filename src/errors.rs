//! Error types for FlowPulse

use thiserror::Error;

/// Main error type for FlowPulse
#[derive(Error, Debug)]
pub enum FlowpulseError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Report error: {0}")]
    Report(String),
}

impl From<rquickjs::Error> for FlowpulseError {
    fn from(err: rquickjs::Error) -> Self {
        FlowpulseError::Script(format!("JavaScript error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, FlowpulseError>;
