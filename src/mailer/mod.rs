// src/mailer/mod.rs
//! Follow-up email telling the candidate their CV is under review.

use crate::extractors::ExtractedRecord;
use crate::services::client::check_status;
use crate::utils::error::{ScheduleError, ServiceError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

pub const FOLLOW_UP_SUBJECT: &str = "Your CV is Under Review";
const FALLBACK_GREETING_NAME: &str = "Applicant";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl FollowUpEmail {
    /// `None` when the record carries no email address to write to.
    pub fn for_record(record: &ExtractedRecord, from: &str) -> Option<Self> {
        let to = record.email.as_deref().filter(|email| !email.is_empty())?;
        let name = record.name.as_deref().unwrap_or(FALLBACK_GREETING_NAME);

        Some(FollowUpEmail {
            from: from.to_string(),
            to: to.to_string(),
            subject: FOLLOW_UP_SUBJECT.to_string(),
            text: format!(
                "Dear {},\n\n\
                 Thank you for submitting your CV. We wanted to let you know that your CV is currently under review. \
                 We will get back to you soon with more information.\n\n\
                 Best regards,\nCompany",
                name
            ),
        })
    }
}

/// Handle to a pending follow-up.
#[derive(Debug)]
pub struct ScheduledJob {
    send_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl ScheduledJob {
    pub fn send_at(&self) -> DateTime<Utc> {
        self.send_at
    }

    /// Waits until the email has been handed to the relay (or failed to be).
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("Follow-up email task ended abnormally: {}", e);
        }
    }
}

pub struct MailScheduler {
    http: reqwest::Client,
    relay_url: String,
}

impl MailScheduler {
    pub fn new(http: reqwest::Client, relay_url: &str) -> Self {
        Self {
            http,
            relay_url: relay_url.to_string(),
        }
    }

    /// Spawns a task that sleeps until `send_at` and then sends once.
    /// Must be called from within a tokio runtime.
    pub fn schedule(
        &self,
        email: FollowUpEmail,
        send_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ScheduledJob, ScheduleError> {
        let delay = (send_at - now)
            .to_std()
            .ok()
            .filter(|delay| !delay.is_zero())
            .ok_or_else(|| ScheduleError::InPast(send_at.to_rfc3339()))?;

        tracing::info!("Scheduling email to be sent to: {} at {}", email.to, send_at);
        let http = self.http.clone();
        let relay_url = self.relay_url.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("Scheduler triggered at: {}", Utc::now());
            match send_email(&http, &relay_url, &email).await {
                Ok(()) => tracing::info!("Email sent successfully to {}", email.to),
                Err(e) => tracing::error!("Error sending email: {}", e),
            }
        });

        Ok(ScheduledJob { send_at, handle })
    }
}

async fn send_email(http: &reqwest::Client, relay_url: &str, email: &FollowUpEmail) -> Result<(), ServiceError> {
    let response = http.post(relay_url).json(email).send().await?;
    check_status(response, "Mail relay").await?;
    Ok(())
}
