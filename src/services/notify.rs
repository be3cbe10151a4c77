// src/services/notify.rs
use crate::services::client::check_status;
use crate::services::models::{CvPayload, NotifyResult};
use crate::utils::error::ServiceError;

const CANDIDATE_EMAIL_HEADER: &str = "X-Candidate-Email";

/// Forwards the structured CV to the third-party endpoint.
pub struct NotifyClient {
    http: reqwest::Client,
    endpoint: String,
    candidate_email: String,
}

impl NotifyClient {
    pub fn new(http: reqwest::Client, endpoint: &str, candidate_email: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            candidate_email: candidate_email.to_string(),
        }
    }

    pub async fn send(&self, payload: &CvPayload) -> Result<serde_json::Value, ServiceError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(CANDIDATE_EMAIL_HEADER, &self.candidate_email)
            .json(payload)
            .send()
            .await?;

        let response = check_status(response, "Notify endpoint").await?;
        let body = response.text().await?;
        // Not every endpoint answers with JSON; keep plain text as a string value.
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
    }

    /// One attempt; a failure is reported in the result instead of aborting the pipeline.
    pub async fn deliver(&self, payload: &CvPayload) -> NotifyResult {
        match self.send(payload).await {
            Ok(body) => {
                tracing::info!("External API response: {}", body);
                NotifyResult::Delivered(body)
            }
            Err(e) => {
                tracing::error!("Error sending payload to external endpoint: {}", e);
                NotifyResult::failed(e)
            }
        }
    }
}
