use cmk_config::CmkConfig;
use cmk_core::{CmkError, DetectionResult, ResponseEnvelope, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::warn;

mod detect;
mod request;
mod retry;

pub use request::{Params, RequestSpec};
pub use reqwest::Method;

/// CheckMK REST API client.
///
/// One instance serves many concurrent callers: the only shared state is the
/// read-only configuration and the detection result, which is computed at
/// most once and retained for the client's lifetime.
pub struct CmkClient {
    http: reqwest::Client,
    config: Arc<CmkConfig>,
    detection: OnceCell<DetectionResult>,
}

impl CmkClient {
    pub fn new(config: CmkConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            config: Arc::new(config),
            detection: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &CmkConfig {
        &self.config
    }

    /// Which API base URL this deployment serves, plus the probe trace.
    ///
    /// Runs the candidate probes on first use; later calls return the
    /// retained result. Detection never fails: if no candidate answers, the
    /// first one is used as a fallback and `fallback` is set on the result.
    pub async fn detection(&self) -> &DetectionResult {
        self.detection
            .get_or_init(|| detect::detect_api_url(&self.http, &self.config))
            .await
    }

    /// Execute one logical request, retrying transient failures with
    /// exponential backoff up to the configured bound.
    pub async fn request(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        let url = self.build_url(&spec).await;
        retry::execute_with_retry(&self.http, &self.config, &url, &spec).await
    }

    async fn build_url(&self, spec: &RequestSpec) -> String {
        if spec.use_api_prefix {
            format!("{}/{}", self.detection().await.base_url, spec.path)
        } else {
            // Legacy view-style endpoints live outside the REST API prefix.
            format!("{}/cmk/{}", self.config.server_url, spec.path)
        }
    }

    pub async fn get(&self, path: &str, params: Option<Params>) -> Result<ResponseEnvelope> {
        self.request(RequestSpec::get(path).params(params.unwrap_or_default()))
            .await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<ResponseEnvelope> {
        let mut spec = RequestSpec::post(path);
        if let Some(body) = body {
            spec = spec.body(body);
        }
        self.request(spec).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: Option<Value>,
        headers: Option<HashMap<String, String>>,
    ) -> Result<ResponseEnvelope> {
        let mut spec = RequestSpec::put(path);
        if let Some(body) = body {
            spec = spec.body(body);
        }
        for (name, value) in headers.unwrap_or_default() {
            spec = spec.header(name, value);
        }
        self.request(spec).await
    }

    pub async fn delete(&self, path: &str, params: Option<Params>) -> Result<ResponseEnvelope> {
        self.request(RequestSpec::delete(path).params(params.unwrap_or_default()))
            .await
    }

    pub async fn patch(&self, path: &str, body: Option<Value>) -> Result<ResponseEnvelope> {
        let mut spec = RequestSpec::patch(path);
        if let Some(body) = body {
            spec = spec.body(body);
        }
        self.request(spec).await
    }
}

fn build_http_client(config: &CmkConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("cmk-cli/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers);

    if !config.verify_tls {
        warn!("TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| CmkError::Connection(format!("Failed to build HTTP client: {e}")))
}
