//! # catalog-sheets
//!
//! Turn a wholesale line-sheet PDF stored on Google Drive into a Google Sheet
//! of product descriptions written by a vision-capable LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Drive folder
//!  │
//!  ├─ 1. Select    list PDFs, pick the one named exactly like the target
//!  ├─ 2. Download  fetch it locally and check the %PDF magic
//!  ├─ 3. Extract   page text + embedded images via pdfium (spawn_blocking)
//!  ├─ 4. Group     one entry per style number, images attached
//!  ├─ 5. Keywords  optional brand keywords from a Google Doc
//!  ├─ 6. Describe  one LLM vision request per entry → JSON object
//!  ├─ 7. Tabulate  fixed eight columns, gaps filled with "N/A"
//!  └─ 8. Publish   find/create the spreadsheet, move it, clear, write A1
//! ```
//!
//! Steps 1, 2 and 3 can *halt* the run (nothing to do), which is reported as
//! [`RunOutcome::Halted`] rather than an error. See [`error`] for the split.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use catalog_sheets::{run, CatalogConfig, RunOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // LLM provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = CatalogConfig::from_file("catalog.toml")?;
//!     match run(&config).await? {
//!         RunOutcome::Completed(report) => {
//!             println!("{} products described", report.table.len());
//!         }
//!         RunOutcome::Halted(reason) => eprintln!("{reason}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `catalog-sheets` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! catalog-sheets = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod google;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CatalogConfig, CatalogConfigBuilder, DriveFolders};
pub use error::{CatalogError, HaltReason};
pub use google::{DriveApi, SheetsApi};
pub use output::{
    DescriptionRecord, DescriptionTable, DriveFile, ExtractedEntry, PublishReport, RawDescription,
    RunOutcome, RunReport, COLUMNS,
};
pub use pipeline::describe::DescriptionGenerator;
pub use pipeline::extract::PdfExtractor;
pub use pipeline::keywords::get_keywords_from_drive;
pub use pipeline::publish::upload_to_google_sheets;
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use run::{list_pdfs, process_pdf, process_pdf_sync, run, Services};
