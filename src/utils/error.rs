// src/utils/error.rs
use thiserror::Error;

// Errors raised while turning résumé text into an ExtractedRecord
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Input is not valid UTF-8: {0}")]
    InvalidInput(String),

    #[error("Regular expression error: {0}")]
    RegexError(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF decoding failed: {0}")]
    Pdf(String),

    #[error("DOCX decoding failed: {0}")]
    Docx(String),

    #[error("Decoder task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("No file has been uploaded yet")]
    NothingUploaded,
}

// Errors from the remote collaborators (Drive, Sheets, notify endpoint, mail relay)
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error {0}: {1}")]
    Http(reqwest::StatusCode, String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Scheduled date {0} is in the past")]
    InPast(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Remote service call failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Output serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
