use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Normalized result of one successful HTTP call against the CheckMK API.
///
/// `data` is the decoded JSON body (an empty object for empty bodies); `raw`
/// keeps the body text untouched for endpoints whose payload the JSON decoder
/// would normalize away; `headers` carries the response headers so callers can
/// read concurrency-control tokens such as `ETag`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub data: Value,
    pub raw: String,
    pub headers: HashMap<String, String>,
    pub success: bool,
}

impl ResponseEnvelope {
    /// The `ETag` token of this response, if the server sent one. Handlers
    /// pass it back as an `If-Match` precondition on updates.
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("etag"))
            .map(|(_, value)| value.as_str())
    }
}

/// Outcome of endpoint detection: the selected API base URL plus the full
/// probe trace, retained for operator diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub base_url: String,
    pub attempts: Vec<ProbeAttempt>,
    /// True when no candidate answered and the first one was used anyway.
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeAttempt {
    pub candidate: String,
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    Success,
    HttpStatus(u16),
    TransportError(String),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Success => write!(f, "SUCCESS"),
            ProbeOutcome::HttpStatus(code) => write!(f, "HTTP {code}"),
            ProbeOutcome::TransportError(reason) => write!(f, "ERROR ({reason})"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CmkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        status_code: u16,
        body: Value,
    },

    #[error("Permission denied: {message}")]
    Permission {
        message: String,
        status_code: u16,
        body: Value,
    },

    #[error("Resource not found: {message}")]
    NotFound {
        message: String,
        status_code: u16,
        body: Value,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
        body: Value,
    },
}

impl CmkError {
    /// HTTP status that produced this error, when one exists.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CmkError::Authentication { status_code, .. }
            | CmkError::Permission { status_code, .. }
            | CmkError::NotFound { status_code, .. } => Some(*status_code),
            CmkError::Api { status_code, .. } => *status_code,
            CmkError::Connection(_) | CmkError::Validation(_) => None,
        }
    }

    /// Best-effort decoded response body carried by this error, so callers
    /// can surface server-provided detail text.
    pub fn body(&self) -> Option<&Value> {
        match self {
            CmkError::Authentication { body, .. }
            | CmkError::Permission { body, .. }
            | CmkError::NotFound { body, .. }
            | CmkError::Api { body, .. } => Some(body),
            CmkError::Connection(_) | CmkError::Validation(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CmkError>;
