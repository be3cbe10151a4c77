// src/services/sheets.rs
use crate::services::client::{check_status, endpoint};
use crate::services::models::{SheetRow, ValueRange};
use crate::utils::error::ServiceError;

pub struct SheetsClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, api_base: &str, access_token: &str) -> Self {
        Self {
            http,
            api_base: api_base.to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Appends one row after the last filled row of `range`, values stored as-is.
    pub async fn append_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: &SheetRow,
    ) -> Result<serde_json::Value, ServiceError> {
        let url = append_url(&self.api_base, spreadsheet_id, range)?;
        let body = ValueRange { values: vec![row.0.as_slice()] };

        tracing::info!("Appending row to spreadsheet {} ({})", spreadsheet_id, range);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let update: serde_json::Value = check_status(response, "Sheets append").await?.json().await?;
        tracing::debug!("Sheet update response: {}", update);
        Ok(update)
    }
}

fn append_url(api_base: &str, spreadsheet_id: &str, range: &str) -> Result<reqwest::Url, ServiceError> {
    let mut url = endpoint(
        api_base,
        &["spreadsheets", spreadsheet_id, "values", &format!("{}:append", range)],
    )?;
    url.query_pairs_mut()
        .append_pair("valueInputOption", "RAW")
        .append_pair("insertDataOption", "INSERT_ROWS");
    Ok(url)
}
