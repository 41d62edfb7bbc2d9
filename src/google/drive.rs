//! Google Drive v3: list, download, find and move files.

use super::auth::GoogleAuth;
use crate::error::CatalogError;
use crate::output::{DriveFile, GOOGLE_SHEET_MIME};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// The Drive operations a run needs.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Files directly inside `folder_id` with the given MIME type, in the
    /// order the API returns them.
    async fn list_files(&self, folder_id: &str, mime_type: &str)
        -> Result<Vec<DriveFile>, CatalogError>;

    /// Download `file` to `dest`, returning the written path. Google-native
    /// documents are exported as plain text.
    async fn download_file(&self, file: &DriveFile, dest: &Path) -> Result<PathBuf, CatalogError>;

    /// Id of the first spreadsheet named exactly `name`, if any.
    async fn find_spreadsheet(&self, name: &str) -> Result<Option<String>, CatalogError>;

    /// Make `folder_id` the only parent of `file_id`.
    async fn move_to_folder(&self, file_id: &str, folder_id: &str) -> Result<(), CatalogError>;
}

/// REST implementation of [`DriveApi`].
pub struct DriveClient {
    auth: Arc<GoogleAuth>,
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Parents {
    #[serde(default)]
    parents: Vec<String>,
}

impl DriveClient {
    pub fn new(auth: Arc<GoogleAuth>, http: reqwest::Client) -> Self {
        Self {
            auth,
            http,
            base_url: DRIVE_API_BASE.to_string(),
        }
    }

    /// Point the client at another endpoint (an emulator or proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<DriveFile>, CatalogError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.auth.access_token().await?;
            let mut request = self
                .http
                .get(format!("{}/files", self.base_url))
                .bearer_auth(&token)
                .query(&[
                    ("q", query),
                    ("fields", "nextPageToken, files(id, name, mimeType)"),
                    ("pageSize", "1000"),
                    ("supportsAllDrives", "true"),
                    ("includeItemsFromAllDrives", "true"),
                ]);
            if let Some(ref t) = page_token {
                request = request.query(&[("pageToken", t.as_str())]);
            }

            let response = send(request, "list").await?;
            let page: FileList = response.json().await.map_err(|e| drive_err("list", None, e))?;
            files.extend(page.files);

            match page.next_page_token {
                Some(t) if !t.is_empty() => page_token = Some(t),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn parents_of(&self, file_id: &str) -> Result<Vec<String>, CatalogError> {
        let token = self.auth.access_token().await?;
        let request = self
            .http
            .get(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(&token)
            .query(&[("fields", "parents"), ("supportsAllDrives", "true")]);
        let response = send(request, "get parents").await?;
        let parents: Parents = response
            .json()
            .await
            .map_err(|e| drive_err("get parents", None, e))?;
        Ok(parents.parents)
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_files(
        &self,
        folder_id: &str,
        mime_type: &str,
    ) -> Result<Vec<DriveFile>, CatalogError> {
        let files = self.search(&folder_query(folder_id, mime_type)).await?;
        debug!("Folder {} holds {} file(s) of type {}", folder_id, files.len(), mime_type);
        Ok(files)
    }

    async fn download_file(&self, file: &DriveFile, dest: &Path) -> Result<PathBuf, CatalogError> {
        let token = self.auth.access_token().await?;
        let request = if file.is_google_native() {
            self.http
                .get(format!("{}/files/{}/export", self.base_url, file.id))
                .query(&[("mimeType", "text/plain")])
        } else {
            self.http
                .get(format!("{}/files/{}", self.base_url, file.id))
                .query(&[("alt", "media"), ("supportsAllDrives", "true")])
        };

        let response = send(request.bearer_auth(&token), "download").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| drive_err("download", None, e))?;

        write_atomic(dest, &bytes)?;
        info!("Downloaded '{}' ({} bytes) to {}", file.name, bytes.len(), dest.display());
        Ok(dest.to_path_buf())
    }

    async fn find_spreadsheet(&self, name: &str) -> Result<Option<String>, CatalogError> {
        let files = self.search(&name_query(name, GOOGLE_SHEET_MIME)).await?;
        Ok(files.into_iter().next().map(|f| f.id))
    }

    async fn move_to_folder(&self, file_id: &str, folder_id: &str) -> Result<(), CatalogError> {
        let parents = self.parents_of(file_id).await?;
        if parents.len() == 1 && parents[0] == folder_id {
            debug!("File {} already in folder {}", file_id, folder_id);
            return Ok(());
        }

        let remove = parents
            .iter()
            .map(String::as_str)
            .filter(|p| *p != folder_id)
            .collect::<Vec<_>>()
            .join(",");

        let token = self.auth.access_token().await?;
        let request = self
            .http
            .patch(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(&token)
            .query(&[
                ("addParents", folder_id),
                ("removeParents", remove.as_str()),
                ("fields", "id, parents"),
                ("supportsAllDrives", "true"),
            ])
            .json(&serde_json::json!({}));
        send(request, "move").await?;
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Drive query matching non-trashed files of one type inside a folder.
pub fn folder_query(folder_id: &str, mime_type: &str) -> String {
    format!(
        "'{}' in parents and mimeType = '{}' and trashed = false",
        escape_query(folder_id),
        escape_query(mime_type)
    )
}

/// Drive query matching non-trashed files of one type by exact name.
pub fn name_query(name: &str, mime_type: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query(name),
        escape_query(mime_type)
    )
}

/// Escape a string literal for the Drive query language.
fn escape_query(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

async fn send(
    request: reqwest::RequestBuilder,
    operation: &'static str,
) -> Result<reqwest::Response, CatalogError> {
    let response = request
        .send()
        .await
        .map_err(|e| drive_err(operation, None, e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::DriveApi {
            operation,
            status: Some(status.as_u16()),
            detail: body,
        });
    }
    Ok(response)
}

fn drive_err(operation: &'static str, status: Option<u16>, e: reqwest::Error) -> CatalogError {
    CatalogError::DriveApi {
        operation,
        status: status.or_else(|| e.status().map(|s| s.as_u16())),
        detail: e.to_string(),
    }
}

/// Write through a temp file in the destination directory, then rename, so
/// a failed download never leaves a truncated file under the final name.
fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: dest.to_path_buf(),
        source,
    };
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.persist(dest).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_query_matches_type_and_parent() {
        assert_eq!(
            folder_query("abc123", "application/pdf"),
            "'abc123' in parents and mimeType = 'application/pdf' and trashed = false"
        );
    }

    #[test]
    fn name_query_escapes_quotes() {
        let q = name_query("Kid's Line", GOOGLE_SHEET_MIME);
        assert!(q.starts_with(r"name = 'Kid\'s Line'"), "got {q}");
        assert!(q.contains("application/vnd.google-apps.spreadsheet"));
    }

    #[test]
    fn escape_handles_backslashes_first() {
        assert_eq!(escape_query(r"a\'b"), r"a\\\'b");
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("test.pdf");
        write_atomic(&dest, b"%PDF-1.7").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn write_atomic_overwrites() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("keywords.txt");
        write_atomic(&dest, b"old, words").unwrap();
        write_atomic(&dest, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    }
}
