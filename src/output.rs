//! Records passed between pipeline stages, and the run result.

use crate::error::HaltReason;
use edgequake_llm::ImageData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// MIME type Drive reports for PDFs.
pub const PDF_MIME: &str = "application/pdf";
/// MIME type Drive reports for Google Docs.
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
/// MIME type Drive reports for Google Sheets.
pub const GOOGLE_SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Value written for any column the generator did not return.
pub const FILL_VALUE: &str = "N/A";

/// Output columns, in sheet order.
pub const COLUMNS: [&str; 8] = [
    "Style Number",
    "Product Title",
    "Product Description",
    "Tags",
    "Product Category",
    "Product Type",
    "Option2 Value",
    "Keywords",
];

/// A file in Google Drive. Not owned by this crate; re-listed every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

impl DriveFile {
    /// Google-native documents have no bytes of their own and must be exported.
    pub fn is_google_native(&self) -> bool {
        self.mime_type.starts_with("application/vnd.google-apps.")
    }
}

/// One product found in the PDF.
#[derive(Clone)]
pub struct ExtractedEntry {
    pub style_number: String,
    /// Base64 PNG images depicting the product.
    pub images: Vec<ImageData>,
}

impl fmt::Debug for ExtractedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedEntry")
            .field("style_number", &self.style_number)
            .field("images", &self.images.len())
            .finish()
    }
}

/// Whatever structured object the description generator produced.
pub type RawDescription = serde_json::Map<String, serde_json::Value>;

/// One output row. Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRecord {
    #[serde(rename = "Style Number")]
    pub style_number: String,
    #[serde(rename = "Product Title")]
    pub product_title: String,
    #[serde(rename = "Product Description")]
    pub product_description: String,
    #[serde(rename = "Tags")]
    pub tags: String,
    #[serde(rename = "Product Category")]
    pub product_category: String,
    #[serde(rename = "Product Type")]
    pub product_type: String,
    #[serde(rename = "Option2 Value")]
    pub option2_value: String,
    #[serde(rename = "Keywords")]
    pub keywords: String,
}

impl DescriptionRecord {
    /// Cell values in column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.style_number.clone(),
            self.product_title.clone(),
            self.product_description.clone(),
            self.tags.clone(),
            self.product_category.clone(),
            self.product_type.clone(),
            self.option2_value.clone(),
            self.keywords.clone(),
        ]
    }
}

/// The assembled result: one record per extracted entry, in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionTable {
    pub records: Vec<DescriptionRecord>,
}

impl DescriptionTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header row followed by one row per record, ready for a sheet write.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        let mut values = Vec::with_capacity(self.records.len() + 1);
        values.push(COLUMNS.iter().map(|c| c.to_string()).collect());
        values.extend(self.records.iter().map(DescriptionRecord::to_row));
        values
    }
}

/// What the publish step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub spreadsheet_id: String,
    pub spreadsheet_name: String,
    /// The spreadsheet did not exist and was created.
    pub created: bool,
    /// The spreadsheet now sits in the PDF folder. `false` means the move failed.
    pub moved: bool,
    /// Data rows written, header excluded.
    pub rows_written: usize,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pdf: DriveFile,
    pub local_path: PathBuf,
    pub keyword_count: usize,
    pub table: DescriptionTable,
    /// `None` on a dry run.
    pub publish: Option<PublishReport>,
    pub duration_ms: u64,
}

/// Result of [`crate::run::process_pdf`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed(Box<RunReport>),
    Halted(HaltReason),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        match self {
            RunOutcome::Halted(r) => Some(r),
            RunOutcome::Completed(_) => None,
        }
    }
}
