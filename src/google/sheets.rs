//! Google Sheets v4: create a spreadsheet, find or add its first worksheet,
//! clear it and write values.

use super::auth::GoogleAuth;
use crate::error::CatalogError;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// A tab inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
}

/// The Sheets operations a run needs.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Create an empty spreadsheet titled `title`; returns its id.
    async fn create_spreadsheet(&self, title: &str) -> Result<String, CatalogError>;

    /// The worksheet with the lowest index, if the spreadsheet has any.
    async fn first_worksheet(&self, spreadsheet_id: &str)
        -> Result<Option<Worksheet>, CatalogError>;

    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<Worksheet, CatalogError>;

    /// Remove every value on the worksheet.
    async fn clear_worksheet(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
    ) -> Result<(), CatalogError>;

    /// Write `rows` starting at cell A1.
    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        rows: &[Vec<String>],
    ) -> Result<(), CatalogError>;
}

/// REST implementation of [`SheetsApi`].
pub struct SheetsClient {
    auth: Arc<GoogleAuth>,
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetSheets {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<serde_json::Value>,
}

impl SheetsClient {
    pub fn new(auth: Arc<GoogleAuth>, http: reqwest::Client) -> Self {
        Self {
            auth,
            http,
            base_url: SHEETS_API_BASE.to_string(),
        }
    }

    /// Point the client at another endpoint (an emulator or proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn create_spreadsheet(&self, title: &str) -> Result<String, CatalogError> {
        let token = self.auth.access_token().await?;
        let request = self
            .http
            .post(format!("{}/spreadsheets", self.base_url))
            .bearer_auth(&token)
            .json(&json!({ "properties": { "title": title } }));
        let response = send(request, "create").await?;
        let created: CreatedSpreadsheet = response
            .json()
            .await
            .map_err(|e| sheets_err("create", e))?;
        debug!("Created spreadsheet {} ({})", title, created.spreadsheet_id);
        Ok(created.spreadsheet_id)
    }

    async fn first_worksheet(
        &self,
        spreadsheet_id: &str,
    ) -> Result<Option<Worksheet>, CatalogError> {
        let token = self.auth.access_token().await?;
        let request = self
            .http
            .get(format!("{}/spreadsheets/{}", self.base_url, spreadsheet_id))
            .bearer_auth(&token)
            .query(&[("fields", "sheets.properties(sheetId,title,index)")]);
        let response = send(request, "get").await?;
        let body: SpreadsheetSheets = response.json().await.map_err(|e| sheets_err("get", e))?;
        Ok(body
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .min_by_key(|p| p.index)
            .map(|p| Worksheet {
                sheet_id: p.sheet_id,
                title: p.title,
            }))
    }

    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<Worksheet, CatalogError> {
        let token = self.auth.access_token().await?;
        let request = self
            .http
            .post(format!(
                "{}/spreadsheets/{}:batchUpdate",
                self.base_url, spreadsheet_id
            ))
            .bearer_auth(&token)
            .json(&json!({
                "requests": [{
                    "addSheet": {
                        "properties": {
                            "title": title,
                            "gridProperties": { "rowCount": rows, "columnCount": cols }
                        }
                    }
                }]
            }));
        let response = send(request, "add worksheet").await?;
        let body: BatchUpdateResponse = response
            .json()
            .await
            .map_err(|e| sheets_err("add worksheet", e))?;
        let sheet_id = body
            .replies
            .first()
            .and_then(|r| r.pointer("/addSheet/properties/sheetId"))
            .and_then(|v| v.as_i64())
            .unwrap_or_default();
        Ok(Worksheet {
            sheet_id,
            title: title.to_string(),
        })
    }

    async fn clear_worksheet(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
    ) -> Result<(), CatalogError> {
        let url = values_url(&self.base_url, spreadsheet_id, &sheet_range(&worksheet.title), ":clear")?;
        let token = self.auth.access_token().await?;
        let request = self.http.post(url).bearer_auth(&token).json(&json!({}));
        send(request, "clear").await?;
        Ok(())
    }

    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        rows: &[Vec<String>],
    ) -> Result<(), CatalogError> {
        let range = format!("{}!A1", sheet_range(&worksheet.title));
        let url = values_url(&self.base_url, spreadsheet_id, &range, "")?;
        let token = self.auth.access_token().await?;
        let request = self
            .http
            .put(url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }));
        send(request, "update").await?;
        Ok(())
    }
}

/// A1-notation reference to a whole worksheet: the title in single quotes,
/// embedded quotes doubled.
pub fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// `{base}/spreadsheets/{id}/values/{range}{suffix}` with the range
/// percent-encoded as a single path segment.
fn values_url(
    base_url: &str,
    spreadsheet_id: &str,
    range: &str,
    suffix: &str,
) -> Result<Url, CatalogError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| CatalogError::Internal(format!("bad Sheets base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| CatalogError::Internal("Sheets base URL cannot carry a path".into()))?
        .pop_if_empty()
        .extend(["spreadsheets", spreadsheet_id, "values"])
        .push(&format!("{range}{suffix}"));
    Ok(url)
}

async fn send(
    request: reqwest::RequestBuilder,
    operation: &'static str,
) -> Result<reqwest::Response, CatalogError> {
    let response = request.send().await.map_err(|e| sheets_err(operation, e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::SheetsApi {
            operation,
            status: Some(status.as_u16()),
            detail: body,
        });
    }
    Ok(response)
}

fn sheets_err(operation: &'static str, e: reqwest::Error) -> CatalogError {
    CatalogError::SheetsApi {
        operation,
        status: e.status().map(|s| s.as_u16()),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_range_quotes_title() {
        assert_eq!(sheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(sheet_range("Kid's Line"), "'Kid''s Line'");
    }

    #[test]
    fn values_url_encodes_range_segment() {
        let url = values_url(SHEETS_API_BASE, "abc", "'My Sheet'!A1", "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20Sheet'!A1"
        );
        let clear = values_url(SHEETS_API_BASE, "abc", "'Sheet1'", ":clear").unwrap();
        assert!(clear.as_str().ends_with("/values/'Sheet1':clear"));
    }

    #[test]
    fn sheet_properties_default_missing_fields() {
        let body: SpreadsheetSheets = serde_json::from_str(
            r#"{"sheets":[{"properties":{"title":"Second","index":1,"sheetId":7}},{"properties":{"title":"Sheet1"}}]}"#,
        )
        .unwrap();
        let first = body.sheets.into_iter().map(|s| s.properties).min_by_key(|p| p.index).unwrap();
        assert_eq!(first.title, "Sheet1");
        assert_eq!(first.sheet_id, 0);
    }

    #[test]
    fn empty_spreadsheet_has_no_sheets() {
        let body: SpreadsheetSheets = serde_json::from_str("{}").unwrap();
        assert!(body.sheets.is_empty());
    }
}
