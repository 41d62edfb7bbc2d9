//! Run orchestration: select the PDF, extract, describe, publish.
//!
//! Stages are awaited one after another and entries are described one at a
//! time. A run ends in one of three ways:
//!
//! * `Ok(RunOutcome::Completed)` with a [`RunReport`]
//! * `Ok(RunOutcome::Halted)` when there is nothing to work on; the reason is
//!   logged with `error!` and no spreadsheet is touched
//! * `Err(CatalogError)` when something that should have worked failed

use crate::config::CatalogConfig;
use crate::error::{CatalogError, HaltReason};
use crate::google::{self, DriveApi, SheetsApi};
use crate::output::{DriveFile, RawDescription, RunOutcome, RunReport, PDF_MIME};
use crate::pipeline::describe::{DescriptionGenerator, LlmDescriptionGenerator};
use crate::pipeline::extract::{PdfExtractor, PdfiumExtractor};
use crate::pipeline::{input, keywords, publish, tabulate};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The external collaborators of a run.
///
/// [`Services::from_config`] wires the real ones; tests build this struct
/// directly with fakes.
#[derive(Clone)]
pub struct Services {
    pub drive: Arc<dyn DriveApi>,
    pub sheets: Arc<dyn SheetsApi>,
    pub extractor: Arc<dyn PdfExtractor>,
    pub generator: Arc<dyn DescriptionGenerator>,
}

impl Services {
    /// Google clients, pdfium extractor and LLM generator from `config`.
    ///
    /// Credentials are checked first, so a missing key file fails before the
    /// LLM provider is resolved or any request is made.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let (drive, sheets) = google::connect(config)?;
        let extractor = PdfiumExtractor::from_config(config)?;
        let generator = LlmDescriptionGenerator::from_config(config)?;
        Ok(Self {
            drive: Arc::new(drive),
            sheets: Arc::new(sheets),
            extractor: Arc::new(extractor),
            generator: Arc::new(generator),
        })
    }
}

/// Build the real services and process the configured PDF.
pub async fn run(config: &CatalogConfig) -> Result<RunOutcome, CatalogError> {
    let services = Services::from_config(config)?;
    process_pdf(config, &services).await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_pdf_sync(config: &CatalogConfig) -> Result<RunOutcome, CatalogError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CatalogError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// List the PDFs in the configured folder without processing anything.
///
/// Needs only the Google credentials, not an LLM provider or pdfium.
pub async fn list_pdfs(config: &CatalogConfig) -> Result<Vec<DriveFile>, CatalogError> {
    let (drive, _sheets) = google::connect(config)?;
    drive.list_files(&config.folders.pdf, PDF_MIME).await
}

/// Process the target PDF of the configured folder end to end.
pub async fn process_pdf(
    config: &CatalogConfig,
    services: &Services,
) -> Result<RunOutcome, CatalogError> {
    let start = Instant::now();

    // ── Step 1: Select the PDF ───────────────────────────────────────────
    info!("Listing PDFs in Google Drive folder {}", config.folders.pdf);
    let pdf_files = services
        .drive
        .list_files(&config.folders.pdf, PDF_MIME)
        .await?;

    if pdf_files.is_empty() {
        return Ok(halt(HaltReason::NoPdfFiles {
            folder_id: config.folders.pdf.clone(),
        }));
    }

    info!("Available PDFs in Drive:");
    for f in &pdf_files {
        info!("  {} | {}", f.name, f.id);
    }

    let Some(pdf) = pdf_files.iter().find(|f| f.name == config.target_pdf).cloned() else {
        return Ok(halt(HaltReason::TargetNotFound {
            target: config.target_pdf.clone(),
            available: pdf_files.into_iter().map(|f| f.name).collect(),
        }));
    };

    // ── Step 2: Download and check ───────────────────────────────────────
    let dest = config
        .download_dir
        .join(input::local_file_name(&pdf.name));
    let local_path = match services.drive.download_file(&pdf, &dest).await {
        Ok(p) => p,
        Err(e) => {
            return Ok(halt(HaltReason::DownloadFailed {
                name: pdf.name.clone(),
                detail: e.to_string(),
            }))
        }
    };
    if let Err(reason) = input::verify_downloaded_pdf(&local_path) {
        return Ok(halt(reason));
    }
    info!("Downloaded '{}' to {}", pdf.name, local_path.display());

    // ── Step 3: Extract entries ──────────────────────────────────────────
    let entries = services.extractor.extract(&local_path).await?;
    if entries.is_empty() {
        return Ok(halt(HaltReason::NothingExtracted {
            name: pdf.name.clone(),
        }));
    }
    debug!(
        "Style numbers: {:?}",
        entries.iter().map(|e| e.style_number.as_str()).collect::<Vec<_>>()
    );

    // ── Step 4: Keywords ─────────────────────────────────────────────────
    let keywords = keywords::get_keywords_from_drive(
        services.drive.as_ref(),
        &config.folders.doc,
        &config.download_dir,
    )
    .await;

    // ── Step 5: Describe each entry ──────────────────────────────────────
    let total = entries.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    let mut descriptions: Vec<RawDescription> = Vec::with_capacity(total);
    for (i, entry) in entries.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_entry_start(index, total, &entry.style_number);
        }

        match services
            .generator
            .generate(&entry.style_number, &entry.images, &keywords)
            .await
        {
            Ok(description) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_entry_complete(index, total, &entry.style_number);
                }
                descriptions.push(description);
            }
            Err(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_entry_error(index, total, &entry.style_number, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total);
    }

    // ── Step 6: Table ────────────────────────────────────────────────────
    let table = tabulate::build_table(&descriptions);

    // ── Step 7: Publish ──────────────────────────────────────────────────
    let publish = if config.publish {
        let report = publish::upload_to_google_sheets(
            services.drive.as_ref(),
            services.sheets.as_ref(),
            &table,
            &pdf.name,
            &config.folders.pdf,
        )
        .await?;
        if report.moved {
            info!(
                "Process completed. PDF and Google Sheet are in the same folder: {}",
                config.folders.pdf
            );
        } else {
            info!("Process completed. Google Sheet id: {}", report.spreadsheet_id);
        }
        Some(report)
    } else {
        info!("Dry run: {} row(s) not published", table.len());
        None
    };

    Ok(RunOutcome::Completed(Box::new(RunReport {
        pdf,
        local_path,
        keyword_count: keywords.len(),
        table,
        publish,
        duration_ms: start.elapsed().as_millis() as u64,
    })))
}

fn halt(reason: HaltReason) -> RunOutcome {
    error!("{}", reason);
    RunOutcome::Halted(reason)
}
