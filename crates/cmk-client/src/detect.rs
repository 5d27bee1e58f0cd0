//! API base-URL detection for the varying reverse-proxy layouts CheckMK
//! deployments sit behind.

use cmk_config::CmkConfig;
use cmk_core::{DetectionResult, ProbeAttempt, ProbeOutcome};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

/// Candidate base URLs in priority order. More specific prefixes come before
/// generic ones to avoid false positives; the order must not change.
pub(crate) fn candidate_base_urls(config: &CmkConfig) -> Vec<String> {
    let server = &config.server_url;
    let site = &config.site;
    vec![
        format!("{server}/cmk/check_mk/api/1.0"),
        format!("{server}/{site}/check_mk/api/1.0"),
        format!("{server}/check_mk/api/1.0"),
        format!("{server}/api/1.0"),
        format!("{server}/{site}/cmk/check_mk/api/1.0"),
    ]
}

/// Probe each candidate with `GET {candidate}/version` and select the first
/// that answers HTTP 200. Never fails: if no candidate answers, the first one
/// (the most common deployment layout) is used and the trace records why.
pub(crate) async fn detect_api_url(http: &reqwest::Client, config: &CmkConfig) -> DetectionResult {
    let candidates = candidate_base_urls(config);
    let mut attempts = Vec::with_capacity(candidates.len());

    for candidate in &candidates {
        let probe_url = format!("{candidate}/version");
        debug!("Probing API base URL: {probe_url}");

        let outcome = match http
            .get(&probe_url)
            .basic_auth(&config.username, Some(&config.password))
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => ProbeOutcome::Success,
            Ok(response) => ProbeOutcome::HttpStatus(response.status().as_u16()),
            Err(e) => ProbeOutcome::TransportError(e.to_string()),
        };

        let selected = outcome == ProbeOutcome::Success;
        attempts.push(ProbeAttempt {
            candidate: candidate.clone(),
            outcome,
        });

        if selected {
            info!("Detected API base URL: {candidate}");
            return DetectionResult {
                base_url: candidate.clone(),
                attempts,
                fallback: false,
            };
        }
    }

    let fallback_url = candidates[0].clone();
    warn!("No API base URL candidate answered, using fallback: {fallback_url}");
    DetectionResult {
        base_url: fallback_url,
        attempts,
        fallback: true,
    }
}
