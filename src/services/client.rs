// src/services/client.rs
use crate::utils::error::ServiceError;
use std::time::Duration;

const USER_AGENT: &str = concat!("cv_pipeline/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Creates the reqwest client shared by every collaborator.
pub fn build_http_client() -> Result<reqwest::Client, ServiceError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

/// Single attempt: turns a non-2xx response into `ServiceError::Http` with the body attached.
pub async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!("{} failed with HTTP {}: {}", what, status, body);
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        tracing::warn!("{} was rejected - check the access token and its scopes.", what);
    }
    Err(ServiceError::Http(status, body))
}

/// Joins a base URL and path segments, percent-encoding each segment.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<reqwest::Url, ServiceError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ServiceError::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
