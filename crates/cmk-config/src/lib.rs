use cmk_core::{CmkError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// CheckMK server connection parameters.
///
/// Immutable once constructed; both constructors validate every field and
/// normalize `server_url` before returning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmkConfig {
    pub server_url: String,
    pub site: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl CmkConfig {
    pub fn new(
        server_url: impl Into<String>,
        site: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let mut config = Self {
            server_url: server_url.into(),
            site: site.into(),
            username: username.into(),
            password: password.into(),
            verify_tls: default_verify_tls(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        };
        config.validate_and_normalize()?;
        Ok(config)
    }

    /// Load configuration from `CHECKMK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            server_url: env::var("CHECKMK_SERVER_URL")
                .map_err(|_| CmkError::Validation("CHECKMK_SERVER_URL is required".into()))?,
            site: env::var("CHECKMK_SITE")
                .map_err(|_| CmkError::Validation("CHECKMK_SITE is required".into()))?,
            username: env::var("CHECKMK_USERNAME")
                .map_err(|_| CmkError::Validation("CHECKMK_USERNAME is required".into()))?,
            password: env::var("CHECKMK_PASSWORD")
                .map_err(|_| CmkError::Validation("CHECKMK_PASSWORD is required".into()))?,
            verify_tls: env::var("CHECKMK_VERIFY_TLS")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or_else(|_| default_verify_tls()),
            timeout_secs: parse_env_var("CHECKMK_TIMEOUT", default_timeout_secs())?,
            max_retries: parse_env_var("CHECKMK_MAX_RETRIES", default_max_retries())?,
        };
        config.validate_and_normalize()?;
        Ok(config)
    }

    /// Field checks first, then the one rewrite: `server_url` is replaced by
    /// its normalized form. Only the constructors call this.
    fn validate_and_normalize(&mut self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(CmkError::Validation("Server URL cannot be empty".into()));
        }
        if self.site.is_empty() {
            return Err(CmkError::Validation("Site cannot be empty".into()));
        }
        if self.username.is_empty() {
            return Err(CmkError::Validation("Username cannot be empty".into()));
        }
        if self.password.is_empty() {
            return Err(CmkError::Validation("Password cannot be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CmkError::Validation("Timeout must be positive".into()));
        }
        self.server_url = normalize_server_url(&self.server_url)?;
        Ok(())
    }
}

/// Require an explicit http/https scheme and strip any trailing slash, so
/// candidate base URLs can be built by plain concatenation.
fn normalize_server_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw)
        .map_err(|e| CmkError::Validation(format!("Invalid server URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CmkError::Validation(format!(
                "Server URL must use http or https, got '{other}'"
            )))
        }
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| CmkError::Validation(format!("{name} must be a number, got '{value}'"))),
        Err(_) => Ok(default),
    }
}

fn default_verify_tls() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}
