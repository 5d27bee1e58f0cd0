//! Request execution with bounded exponential-backoff retries and terminal
//! error classification.

use cmk_config::CmkConfig;
use cmk_core::{CmkError, ResponseEnvelope, Result};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::request::{encode_query, RequestSpec};

const RETRYABLE_STATUS: [u16; 4] = [500, 502, 503, 504];

/// Failure of a single attempt, before retry and classification decisions.
enum AttemptError {
    Http {
        status: u16,
        reason: String,
        body: Value,
    },
    Transport(reqwest::Error),
    /// Already classified; bypasses retry entirely (decode failure on 2xx).
    Fatal(CmkError),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::Http { status, .. } => RETRYABLE_STATUS.contains(status),
            // Timeouts are terminal: a slow server must not receive amplified load.
            AttemptError::Transport(err) => !err.is_timeout(),
            AttemptError::Fatal(_) => false,
        }
    }
}

/// Re-issue the identical request on transient failures, sleeping `2^n`
/// seconds between attempts, up to `max_retries` retries. The sleep suspends
/// only this call; unrelated in-flight requests are unaffected.
pub(crate) async fn execute_with_retry(
    http: &reqwest::Client,
    config: &CmkConfig,
    url: &str,
    spec: &RequestSpec,
) -> Result<ResponseEnvelope> {
    let mut attempt: u32 = 0;
    loop {
        match execute_once(http, config, url, spec).await {
            Ok(envelope) => return Ok(envelope),
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(err) if err.is_transient() && attempt < config.max_retries => {
                let delay = backoff_delay(attempt);
                debug!(
                    "Transient failure on {} {url}, retrying in {delay:?}",
                    spec.method
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(classify(err)),
        }
    }
}

/// `2^n` seconds, unjittered. Saturates on degenerate retry bounds instead
/// of overflowing.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

async fn execute_once(
    http: &reqwest::Client,
    config: &CmkConfig,
    url: &str,
    spec: &RequestSpec,
) -> std::result::Result<ResponseEnvelope, AttemptError> {
    let mut builder = http
        .request(spec.method.clone(), url)
        .basic_auth(&config.username, Some(&config.password));

    let pairs = encode_query(&spec.params);
    if !pairs.is_empty() {
        builder = builder.query(&pairs);
    }
    // Only POST/PUT/PATCH carry a body; GET and DELETE never do.
    if let Some(body) = &spec.body {
        if spec.method == reqwest::Method::POST
            || spec.method == reqwest::Method::PUT
            || spec.method == reqwest::Method::PATCH
        {
            builder = builder.json(body);
        }
    }
    // Caller-supplied headers land last so they win over the defaults.
    for (name, value) in &spec.headers {
        builder = builder.header(name, value);
    }

    debug!("{} {url}", spec.method);
    let response = builder.send().await.map_err(AttemptError::Transport)?;

    let status = response.status();
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect();
    let raw = response.text().await.map_err(AttemptError::Transport)?;

    if status.is_success() {
        let data = if raw.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&raw).map_err(|e| {
                AttemptError::Fatal(CmkError::Api {
                    message: format!("Invalid JSON response: {e}"),
                    status_code: Some(status.as_u16()),
                    body: json!({ "raw": raw.clone() }),
                })
            })?
        };
        debug!("Response: {status}");
        Ok(ResponseEnvelope {
            status: status.as_u16(),
            data,
            raw,
            headers,
            success: true,
        })
    } else {
        let reason = status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
        // Best-effort decode; non-JSON error bodies become {"error": reason}.
        let body = serde_json::from_str(&raw).unwrap_or_else(|_| json!({ "error": reason }));
        Err(AttemptError::Http {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

fn classify(err: AttemptError) -> CmkError {
    match err {
        AttemptError::Http {
            status,
            reason,
            body,
        } => match status {
            401 => CmkError::Authentication {
                message: reason,
                status_code: status,
                body,
            },
            403 => CmkError::Permission {
                message: reason,
                status_code: status,
                body,
            },
            404 => CmkError::NotFound {
                message: reason,
                status_code: status,
                body,
            },
            _ => CmkError::Api {
                message: format!("HTTP {status}: {reason}"),
                status_code: Some(status),
                body,
            },
        },
        AttemptError::Transport(e) if e.is_timeout() => {
            CmkError::Connection(format!("Request timeout: {e}"))
        }
        AttemptError::Transport(e) => CmkError::Connection(format!("Connection error: {e}")),
        AttemptError::Fatal(e) => e,
    }
}
