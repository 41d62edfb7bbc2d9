//! Write the description table to a Google Sheet next to the source PDF.
//!
//! Publishing is an idempotent overwrite: the spreadsheet is looked up by
//! name, its first worksheet is cleared and the full table is written at A1.
//! Running twice on the same PDF leaves one spreadsheet with the latest rows.

use crate::config::spreadsheet_name_for;
use crate::error::CatalogError;
use crate::google::{DriveApi, SheetsApi};
use crate::output::{DescriptionTable, PublishReport};
use tracing::{debug, info, warn};

/// Title of the worksheet added when a spreadsheet has none.
pub const WORKSHEET_TITLE: &str = "Sheet1";
pub const WORKSHEET_ROWS: u32 = 1000;
pub const WORKSHEET_COLS: u32 = 10;

/// Publish `table` to the spreadsheet named after `pdf_filename`, inside
/// `pdf_folder_id`.
///
/// A failed folder move is logged and reported as `moved: false`; every
/// other failure is returned.
pub async fn upload_to_google_sheets(
    drive: &dyn DriveApi,
    sheets: &dyn SheetsApi,
    table: &DescriptionTable,
    pdf_filename: &str,
    pdf_folder_id: &str,
) -> Result<PublishReport, CatalogError> {
    let name = spreadsheet_name_for(pdf_filename);

    let (spreadsheet_id, created) = match drive.find_spreadsheet(&name).await? {
        Some(id) => {
            info!("Google Sheet '{}' already exists ({})", name, id);
            (id, false)
        }
        None => {
            let id = sheets.create_spreadsheet(&name).await?;
            info!("Created Google Sheet '{}' ({})", name, id);
            (id, true)
        }
    };

    debug!("Moving '{}' to folder {}", name, pdf_folder_id);
    let moved = match drive.move_to_folder(&spreadsheet_id, pdf_folder_id).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Failed to move Google Sheet '{}' to folder {}: {}",
                name, pdf_folder_id, e
            );
            false
        }
    };

    let worksheet = match sheets.first_worksheet(&spreadsheet_id).await? {
        Some(ws) => ws,
        None => {
            info!("'{}' has no worksheet; adding '{}'", name, WORKSHEET_TITLE);
            sheets
                .add_worksheet(&spreadsheet_id, WORKSHEET_TITLE, WORKSHEET_ROWS, WORKSHEET_COLS)
                .await?
        }
    };

    sheets.clear_worksheet(&spreadsheet_id, &worksheet).await?;
    sheets
        .write_rows(&spreadsheet_id, &worksheet, &table.to_values())
        .await?;

    info!(
        "Wrote {} row(s) to Google Sheet '{}' / '{}'",
        table.len(),
        name,
        worksheet.title
    );

    Ok(PublishReport {
        spreadsheet_id,
        spreadsheet_name: name,
        created,
        moved,
        rows_written: table.len(),
    })
}
