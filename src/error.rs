//! Error types for the catalog-sheets library.
//!
//! Two distinct types reflect two distinct outcomes:
//!
//! * [`CatalogError`]: **Fatal**: the run cannot proceed at all (missing
//!   credentials, unreadable config, a Drive/Sheets call failed, the LLM
//!   provider is not configured). Returned as `Err(CatalogError)`.
//!
//! * [`HaltReason`]: **Non-fatal**: the run stopped early because there is
//!   nothing to work on (no PDFs in the folder, the target file is absent, the
//!   download came back empty). Returned inside
//!   [`crate::output::RunOutcome::Halted`] so the process can still exit
//!   normally after printing the diagnostic.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the catalog-sheets library.
#[derive(Debug, Error)]
pub enum CatalogError {
    // ── Credentials ───────────────────────────────────────────────────────
    /// The service-account key file does not exist.
    #[error(
        "Service-account credentials not found at '{path}'\n\
Download a JSON key for the service account and place it there, or pass --credentials."
    )]
    CredentialsMissing { path: PathBuf },

    /// The key file exists but could not be read or parsed.
    #[error("Invalid service-account credentials in '{path}': {detail}")]
    InvalidCredentials { path: PathBuf, detail: String },

    /// The OAuth token exchange failed.
    #[error("Google authentication failed: {detail}")]
    AuthFailed { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The config file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or misses required keys.
    #[error("Failed to parse config file '{path}': {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Remote APIs ───────────────────────────────────────────────────────
    /// A Drive API call failed.
    #[error("Drive API {operation} failed{}: {detail}", status_suffix(.status))]
    DriveApi {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    /// A Sheets API call failed.
    #[error("Sheets API {operation} failed{}: {detail}", status_suffix(.status))]
    SheetsApi {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library in the working directory."
    )]
    PdfiumBindingFailed(String),

    /// pdfium could not open or read the document.
    #[error("PDF '{path}' could not be read: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error after all retries.
    #[error("Description generation failed for style '{style_number}': {message}")]
    LlmApiError {
        style_number: String,
        message: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A local file could not be written or read.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Why a run stopped before producing a spreadsheet.
///
/// Every variant carries enough context for a distinguishable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum HaltReason {
    /// The PDF folder listing came back empty.
    #[error("No PDF files found in Google Drive folder '{folder_id}'")]
    NoPdfFiles { folder_id: String },

    /// PDFs exist, but none is named exactly like the target.
    #[error("'{target}' not found in Google Drive. Available PDFs: {}", .available.join(", "))]
    TargetNotFound {
        target: String,
        available: Vec<String>,
    },

    /// The download call failed.
    #[error("Download of '{name}' failed: {detail}")]
    DownloadFailed { name: String, detail: String },

    /// The download reported success but the file is not on disk.
    #[error("PDF file '{}' was not downloaded successfully", .path.display())]
    MissingLocalFile { path: PathBuf },

    /// The downloaded bytes do not start with the PDF magic.
    #[error("Downloaded file '{}' is not a PDF (first bytes: {magic:?})", .path.display())]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium opened the file but no style number was found.
    #[error("No data extracted from '{name}'")]
    NothingExtracted { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_error_includes_status() {
        let e = CatalogError::DriveApi {
            operation: "list",
            status: Some(403),
            detail: "insufficient permissions".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 403"), "got: {msg}");
        assert!(msg.contains("list"));
    }

    #[test]
    fn sheets_error_without_status() {
        let e = CatalogError::SheetsApi {
            operation: "clear",
            status: None,
            detail: "connection reset".into(),
        };
        assert_eq!(e.to_string(), "Sheets API clear failed: connection reset");
    }

    #[test]
    fn credentials_missing_names_path() {
        let e = CatalogError::CredentialsMissing {
            path: PathBuf::from("credentials.json"),
        };
        assert!(e.to_string().contains("credentials.json"));
    }

    #[test]
    fn target_not_found_lists_available() {
        let h = HaltReason::TargetNotFound {
            target: "test.pdf".into(),
            available: vec!["spring.pdf".into(), "fall.pdf".into()],
        };
        let msg = h.to_string();
        assert!(msg.contains("'test.pdf'"));
        assert!(msg.contains("spring.pdf, fall.pdf"));
    }

    #[test]
    fn halt_reasons_are_distinguishable() {
        let reasons = [
            HaltReason::NoPdfFiles {
                folder_id: "f".into(),
            }
            .to_string(),
            HaltReason::DownloadFailed {
                name: "test.pdf".into(),
                detail: "404".into(),
            }
            .to_string(),
            HaltReason::MissingLocalFile {
                path: PathBuf::from("test.pdf"),
            }
            .to_string(),
            HaltReason::NothingExtracted {
                name: "test.pdf".into(),
            }
            .to_string(),
        ];
        for (i, a) in reasons.iter().enumerate() {
            for b in reasons.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
