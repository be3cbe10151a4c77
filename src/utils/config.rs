// src/utils/config.rs
use crate::utils::error::AppError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A1";
pub const DEFAULT_FOLLOW_UP_DELAY_MINUTES: i64 = 24 * 60;
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Settings for the remote collaborators, read from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pre-issued OAuth bearer token used for Drive and Sheets.
    pub google_access_token: String,
    pub drive_folder_id: String,
    pub spreadsheet_id: String,
    pub sheet_range: String,
    pub notify_endpoint: String,
    /// Sent as `X-Candidate-Email` on every notify request.
    pub notify_candidate_email: String,
    pub mail: Option<MailConfig>,
    pub drive_api_base: String,
    pub drive_upload_base: String,
    pub sheets_api_base: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub relay_url: String,
    pub from: String,
    pub send_at: Option<DateTime<Utc>>,
    pub delay: Duration,
}

impl MailConfig {
    /// Absolute send time: the configured instant, or `now + delay`.
    pub fn send_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.send_at.unwrap_or(now + self.delay)
    }
}

impl PipelineConfig {
    /// Process environment, after loading `./.env` if there is one.
    pub fn from_env() -> Result<Self, AppError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => tracing::debug!("No .env file found; using process environment"),
            Err(e) => return Err(AppError::Config(format!("Could not load .env: {}", e))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from a dotenv-style file. Variables already set in the
    /// process environment take precedence, as with `.env`.
    pub fn from_env_file(path: &Path) -> Result<Self, AppError> {
        let file_vars = read_env_file(path)?;
        tracing::debug!("Read {} variables from {}", file_vars.len(), path.display());
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("Required environment variable '{}' is not set", key)))
        };
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let mail = match lookup("MAIL_RELAY_URL").filter(|url| !url.trim().is_empty()) {
            Some(relay_url) => {
                let send_at = lookup("FOLLOW_UP_AT")
                    .map(|raw| {
                        DateTime::parse_from_rfc3339(raw.trim())
                            .map(|at| at.with_timezone(&Utc))
                            .map_err(|e| AppError::Config(format!("FOLLOW_UP_AT '{}' is not RFC 3339: {}", raw, e)))
                    })
                    .transpose()?;
                let delay_minutes = match lookup("FOLLOW_UP_DELAY_MINUTES") {
                    Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                        AppError::Config(format!("FOLLOW_UP_DELAY_MINUTES '{}' must be a whole number", raw))
                    })?,
                    None => DEFAULT_FOLLOW_UP_DELAY_MINUTES,
                };
                Some(MailConfig {
                    relay_url,
                    from: required("MAIL_FROM")?,
                    send_at,
                    delay: Duration::minutes(delay_minutes),
                })
            }
            None => {
                tracing::debug!("MAIL_RELAY_URL not set; follow-up emails are disabled");
                None
            }
        };

        Ok(PipelineConfig {
            google_access_token: required("GOOGLE_ACCESS_TOKEN")?,
            drive_folder_id: required("DRIVE_FOLDER_ID")?,
            spreadsheet_id: required("SPREADSHEET_ID")?,
            sheet_range: optional("SHEET_RANGE", DEFAULT_SHEET_RANGE),
            notify_endpoint: required("NOTIFY_ENDPOINT")?,
            notify_candidate_email: required("NOTIFY_CANDIDATE_EMAIL")?,
            mail,
            drive_api_base: optional("DRIVE_API_BASE", DRIVE_API_BASE),
            drive_upload_base: optional("DRIVE_UPLOAD_BASE", DRIVE_UPLOAD_BASE),
            sheets_api_base: optional("SHEETS_API_BASE", SHEETS_API_BASE),
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, AppError> {
    let config_error = |e: dotenvy::Error| AppError::Config(format!("Could not read {}: {}", path.display(), e));
    dotenvy::from_path_iter(path)
        .map_err(config_error)?
        .map(|item| item.map_err(config_error))
        .collect()
}
