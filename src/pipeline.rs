// src/pipeline.rs
//! Runs one CV through decode, extraction and the remote collaborators, in order.

use crate::decode::{decode_document, DocumentFormat};
use crate::extractors::{ExtractionOutcome, SectionExtractor};
use crate::mailer::{FollowUpEmail, MailScheduler, ScheduledJob};
use crate::services::client::build_http_client;
use crate::services::models::{CvPayload, NotifyResult, SheetRow};
use crate::services::{DriveClient, NotifyClient, SheetsClient};
use crate::storage::StorageManager;
use crate::utils::config::{MailConfig, PipelineConfig};
use crate::utils::error::AppError;
use serde::Serialize;
use std::path::Path;

pub const PROCESSED_MESSAGE: &str = "File processed successfully";

/// Summary printed after a successful `process` run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReport {
    pub message: String,
    pub file_id: String,
    pub extracted_data: ExtractionOutcome,
    pub external_result: NotifyResult,
    pub sheet_response: serde_json::Value,
    pub downloadable_public_link: String,
}

pub struct ProcessOutput {
    pub report: ProcessReport,
    /// Pending follow-up email, if one was scheduled.
    pub follow_up: Option<ScheduledJob>,
}

/// The remote side of the pipeline, built once from configuration.
pub struct Collaborators {
    config: PipelineConfig,
    drive: DriveClient,
    sheets: SheetsClient,
    notify: NotifyClient,
    mail: Option<(MailScheduler, MailConfig)>,
}

impl Collaborators {
    pub fn from_config(config: PipelineConfig) -> Result<Self, AppError> {
        let http = build_http_client()?;
        let drive = DriveClient::new(
            http.clone(),
            &config.drive_api_base,
            &config.drive_upload_base,
            &config.google_access_token,
        );
        let sheets = SheetsClient::new(http.clone(), &config.sheets_api_base, &config.google_access_token);
        let notify = NotifyClient::new(http.clone(), &config.notify_endpoint, &config.notify_candidate_email);
        let mail = config
            .mail
            .clone()
            .map(|mail| (MailScheduler::new(http.clone(), &mail.relay_url), mail));

        Ok(Self { config, drive, sheets, notify, mail })
    }
}

pub struct Pipeline {
    extractor: SectionExtractor,
    storage: StorageManager,
}

impl Pipeline {
    pub fn new(extractor: SectionExtractor, storage: StorageManager) -> Self {
        Self { extractor, storage }
    }

    async fn read_and_decode(&self, path: &Path) -> Result<(Vec<u8>, DocumentFormat, String), AppError> {
        let format = DocumentFormat::from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        tracing::info!("Read {} ({} bytes)", path.display(), bytes.len());

        let text = decode_document(bytes.clone(), format).await?;
        tracing::debug!("Full extracted text:\n{}", text);
        Ok((bytes, format, text))
    }

    /// Decode and extract only; nothing is stored or sent.
    pub async fn extract_file(&self, path: &Path) -> Result<ExtractionOutcome, AppError> {
        let (_, _, text) = self.read_and_decode(path).await?;
        Ok(self.extractor.extract_outcome(text.as_bytes()))
    }

    /// Re-extracts the most recently processed upload from the local archive.
    pub async fn reextract_last(&self) -> Result<ExtractionOutcome, AppError> {
        let path = self.storage.last_upload()?;
        tracing::info!("Re-extracting last upload: {}", path.display());
        self.extract_file(&path).await
    }

    /// Full run: archive, Drive, notify endpoint, spreadsheet, follow-up email.
    pub async fn process(&self, path: &Path, remote: &Collaborators) -> Result<ProcessOutput, AppError> {
        let (bytes, format, text) = self.read_and_decode(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Config(format!("{} has no file name", path.display())))?;

        let outcome = self.extractor.extract_outcome(text.as_bytes());
        tracing::info!("Extracted data: {}", serde_json::to_string(&outcome)?);
        if outcome.is_error() {
            tracing::warn!("Extraction failed for {}; continuing with empty fields", file_name);
        }
        let record = outcome.record().cloned().unwrap_or_default();

        self.storage.save_upload(&file_name, &bytes)?;
        self.storage.save_extraction_metadata(&file_name, bytes.len(), &outcome)?;

        let stored = remote
            .drive
            .store(&file_name, format.mime_type(), &bytes, &remote.config.drive_folder_id)
            .await?;

        let payload = CvPayload::from_record(&record, &stored.web_view_link, chrono::Utc::now());
        let external_result = remote.notify.deliver(&payload).await;
        if external_result.is_error() {
            tracing::warn!("Notify endpoint did not accept the payload; continuing");
        }

        let sheet_response = remote
            .sheets
            .append_row(
                &remote.config.spreadsheet_id,
                &remote.config.sheet_range,
                &SheetRow::from_record(&record),
            )
            .await?;

        let follow_up = match (&remote.mail, FollowUpEmail::for_record(&record, "")) {
            (Some((scheduler, mail)), Some(email)) => {
                let email = FollowUpEmail { from: mail.from.clone(), ..email };
                let now = chrono::Utc::now();
                match scheduler.schedule(email, mail.send_time(now), now) {
                    Ok(job) => {
                        tracing::info!("Job scheduled for: {}", job.send_at());
                        Some(job)
                    }
                    Err(e) => {
                        tracing::error!("Follow-up email not scheduled: {}", e);
                        None
                    }
                }
            }
            (None, Some(_)) => {
                tracing::warn!("No mail relay configured; skipping follow-up email");
                None
            }
            (_, None) => {
                tracing::info!("No email address extracted; skipping follow-up email");
                None
            }
        };

        Ok(ProcessOutput {
            report: ProcessReport {
                message: PROCESSED_MESSAGE.to_string(),
                file_id: stored.id,
                extracted_data: outcome,
                external_result,
                sheet_response,
                downloadable_public_link: stored.web_view_link,
            },
            follow_up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{DecodeError, StorageError};
    use docx_rs::{Docx, Paragraph, Run};

    fn write_docx(path: &Path, lines: &[&str]) {
        let mut docx = Docx::new();
        for line in lines {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)));
        }
        let file = std::fs::File::create(path).unwrap();
        docx.build().pack(file).unwrap();
    }

    fn pipeline(dir: &Path) -> Pipeline {
        Pipeline::new(SectionExtractor::default(), StorageManager::new(dir.join("archive")).unwrap())
    }

    #[tokio::test]
    async fn test_extract_file_from_docx() {
        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("jane.docx");
        write_docx(&cv, &["Jane Doe", "jane@example.com", "Summary: Loves systems.", "Projects", "Built a cache."]);

        let outcome = pipeline(dir.path()).extract_file(&cv).await.unwrap();
        let record = outcome.record().unwrap();
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.email.as_deref(), Some("jane@example.com"));
        assert_eq!(record.field("summary"), Some("Loves systems."));
        assert_eq!(record.field("projects"), Some("Built a cache."));
    }

    #[tokio::test]
    async fn test_unsupported_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("cv.txt");
        std::fs::write(&cv, "Jane Doe").unwrap();

        let err = pipeline(dir.path()).extract_file(&cv).await.unwrap_err();
        assert!(matches!(err, AppError::Decode(DecodeError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_reextract_last_upload() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        assert!(matches!(
            pipeline.reextract_last().await,
            Err(AppError::Storage(StorageError::NothingUploaded))
        ));

        let cv = dir.path().join("sam.docx");
        write_docx(&cv, &["Sam", "Experience", "Job A", "Experience", "Job B"]);
        StorageManager::new(dir.path().join("archive"))
            .unwrap()
            .save_upload("sam.docx", &std::fs::read(&cv).unwrap())
            .unwrap();

        let outcome = pipeline.reextract_last().await.unwrap();
        assert_eq!(outcome.record().unwrap().field("experience"), Some("Job B"));
    }

    #[test]
    fn test_report_field_names() {
        let report = ProcessReport {
            message: PROCESSED_MESSAGE.to_string(),
            file_id: "abc".to_string(),
            extracted_data: SectionExtractor::default().extract_outcome(b"Jane\nSummary: hi"),
            external_result: NotifyResult::failed("down"),
            sheet_response: serde_json::json!({ "updates": {} }),
            downloadable_public_link: "https://view".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        for key in ["message", "fileId", "extractedData", "externalResult", "sheetResponse", "downloadablePublicLink"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["extractedData"]["name"], "Jane");
    }
}
