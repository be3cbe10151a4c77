// src/services/drive.rs
use crate::services::client::{check_status, endpoint};
use crate::services::models::{DriveFile, StoredFile};
use crate::utils::error::ServiceError;
use reqwest::header;

const MULTIPART_BOUNDARY: &str = "cv_pipeline_upload_boundary";

/// Minimal Drive v3 client: upload, share publicly, read back the link.
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
    access_token: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, api_base: &str, upload_base: &str, access_token: &str) -> Self {
        Self {
            http,
            api_base: api_base.to_string(),
            upload_base: upload_base.to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Uploads the file into `folder_id` and returns its Drive id.
    pub async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
        folder_id: &str,
    ) -> Result<String, ServiceError> {
        let mut url = endpoint(&self.upload_base, &["files"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id");

        let metadata = serde_json::json!({
            "name": file_name,
            "parents": [folder_id],
        });
        let body = multipart_related_body(&metadata, mime_type, bytes);

        tracing::info!("Uploading {} ({} bytes) to Drive folder {}", file_name, bytes.len(), folder_id);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await?;

        let file: DriveFile = check_status(response, "Drive upload").await?.json().await?;
        tracing::info!("Google Drive file id: {}", file.id);
        Ok(file.id)
    }

    /// Grants read access to anyone with the link.
    pub async fn make_public(&self, file_id: &str) -> Result<(), ServiceError> {
        let url = endpoint(&self.api_base, &["files", file_id, "permissions"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        check_status(response, "Drive permission update").await?;
        tracing::debug!("Drive file {} is now publicly readable", file_id);
        Ok(())
    }

    pub async fn public_link(&self, file_id: &str) -> Result<String, ServiceError> {
        let mut url = endpoint(&self.api_base, &["files", file_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "id, webViewLink, webContentLink");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let file: DriveFile = check_status(response, "Drive file lookup").await?.json().await?;

        file.public_link()
            .ok_or_else(|| ServiceError::Parse(format!("Drive file {} has no shareable link", file_id)))
    }

    /// Upload, share and fetch the public link in one go.
    pub async fn store(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
        folder_id: &str,
    ) -> Result<StoredFile, ServiceError> {
        let id = self.upload(file_name, mime_type, bytes, folder_id).await?;
        self.make_public(&id).await?;
        let web_view_link = self.public_link(&id).await?;
        tracing::info!("Public link: {}", web_view_link);
        Ok(StoredFile { id, web_view_link })
    }
}

// Drive's multipart upload wants multipart/related: a JSON metadata part, then the media part.
fn multipart_related_body(metadata: &serde_json::Value, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            meta = metadata,
            mime = mime_type,
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}
