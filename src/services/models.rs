// src/services/models.rs
use crate::extractors::ExtractedRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Record fields written to the spreadsheet, in column order.
pub const SHEET_COLUMNS: &[&str] = &[
    "name",
    "email",
    "phone",
    "summary",
    "projects",
    "experience",
    "education",
    "achievements",
    "references",
];

pub const PAYLOAD_STATUS: &str = "prod";
pub const NOTIFY_FAILURE_MESSAGE: &str = "External API call failed";

/// Body sent to the outbound notify endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CvPayload {
    pub cv_data: CvData,
    pub metadata: PayloadMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CvData {
    pub personal_info: PersonalInfo,
    pub education: Vec<String>,
    pub qualifications: Vec<String>,
    pub projects: Vec<String>,
    pub cv_public_link: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PayloadMetadata {
    pub applicant_name: String,
    pub email: String,
    pub status: String,
    pub cv_processed: bool,
    pub processed_timestamp: String,
}

impl CvPayload {
    pub fn from_record(record: &ExtractedRecord, public_link: &str, processed_at: DateTime<Utc>) -> Self {
        let text = |key: &str| record.field(key).unwrap_or_default().to_string();
        // Present sections travel as one-element lists, absent ones as empty lists.
        let list = |key: &str| record.field(key).map(|value| vec![value.to_string()]).unwrap_or_default();

        CvPayload {
            cv_data: CvData {
                personal_info: PersonalInfo {
                    name: text("name"),
                    email: text("email"),
                    phone: text("phone"),
                },
                education: list("education"),
                qualifications: list("qualifications"),
                projects: list("projects"),
                cv_public_link: public_link.to_string(),
            },
            metadata: PayloadMetadata {
                applicant_name: text("name"),
                email: text("email"),
                status: PAYLOAD_STATUS.to_string(),
                cv_processed: true,
                processed_timestamp: processed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }
}

/// What the notify step reports back: the endpoint's JSON, or an error-shaped value.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NotifyResult {
    Delivered(serde_json::Value),
    Failed { error: String, details: String },
}

impl NotifyResult {
    pub fn failed(details: impl ToString) -> Self {
        NotifyResult::Failed {
            error: NOTIFY_FAILURE_MESSAGE.to_string(),
            details: details.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, NotifyResult::Failed { .. })
    }
}

/// One spreadsheet row built from a record; missing fields become empty cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow(pub Vec<String>);

impl SheetRow {
    pub fn from_record(record: &ExtractedRecord) -> Self {
        SheetRow(
            SHEET_COLUMNS
                .iter()
                .map(|column| record.field(column).unwrap_or_default().to_string())
                .collect(),
        )
    }
}

/// Body for the Sheets `values:append` call
#[derive(Debug, Serialize)]
pub struct ValueRange<'a> {
    pub values: Vec<&'a [String]>,
}

/// Drive file fields we ask for
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
}

impl DriveFile {
    /// The viewer link, or the download link when Drive returns no viewer link.
    pub fn public_link(self) -> Option<String> {
        self.web_view_link.or(self.web_content_link)
    }
}

/// Result of storing the original upload remotely
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredFile {
    pub id: String,
    pub web_view_link: String,
}
