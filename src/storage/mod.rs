// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};
use crate::extractors::ExtractionOutcome;
use crate::utils::error::StorageError;

const UPLOADS_DIR: &str = "uploads";
const LAST_UPLOAD_POINTER: &str = "last_upload";

/// Local archive of processed uploads, so the last CV can be re-extracted later.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    fn uploads_dir(&self) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(UPLOADS_DIR);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir)
                .map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    /// Saves the original upload and records it as the most recent one
    pub fn save_upload(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let file_path = self.uploads_dir()?.join(sanitize_file_name(file_name));

        fs::write(&file_path, bytes)
            .map_err(StorageError::IoError)?;
        fs::write(self.base_dir.join(LAST_UPLOAD_POINTER), file_path.to_string_lossy().as_bytes())
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved upload to {} ({} bytes)", file_path.display(), bytes.len());

        Ok(file_path)
    }

    /// Saves the extraction outcome next to the upload in JSON format
    pub fn save_extraction_metadata(
        &self,
        file_name: &str,
        content_length: usize,
        outcome: &ExtractionOutcome,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self
            .uploads_dir()?
            .join(format!("{}.meta.json", sanitize_file_name(file_name)));

        let metadata = serde_json::json!({
            "file_name": file_name,
            "content_length": content_length,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
            "extracted_data": outcome,
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());

        Ok(file_path)
    }

    /// Path of the most recently saved upload
    pub fn last_upload(&self) -> Result<PathBuf, StorageError> {
        let pointer = self.base_dir.join(LAST_UPLOAD_POINTER);
        let target = match fs::read_to_string(&pointer) {
            Ok(target) => PathBuf::from(target.trim()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StorageError::NothingUploaded),
            Err(e) => return Err(StorageError::IoError(e)),
        };

        if !target.exists() {
            tracing::warn!("Last upload {} no longer exists", target.display());
            return Err(StorageError::NothingUploaded);
        }
        Ok(target)
    }
}

// Keeps only the final path component so uploads cannot escape the archive.
fn sanitize_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.is_empty() || name == ".." {
        "upload".to_string()
    } else {
        name
    }
}
